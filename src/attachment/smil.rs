// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! SMIL synthesis and detection. When an outbound message has no SMIL
//! part, a minimal presentation wrapper is generated that places every
//! attachment into a text or media region.

use std::path::Path;

use crate::attachment::Attachment;

const REGION_TEXT: &str = "Text";
const REGION_MEDIA: &str = "Media";

/// Builds the auto-generated SMIL document for the given parts.
pub fn generate_smil(attachments: &[Attachment]) -> String {
    let mut out = String::from(
        "<!DOCTYPE smil PUBLIC \"-//W3C//DTD SMIL 1.0//EN\" \
         \"http://www.w3.org/TR/REC-smil/SMIL10.dtd\">\n\
         <smil>\n \
         <head>\n  \
         <layout>\n   \
         <root-layout height=\"160\" width=\"120\"/>\n    \
         <region fit=\"scroll\" height=\"100%\" left=\"0\" top=\"0\" \
         width=\"100%\" id=\"Text\"/>\n    \
         <region fit=\"meet\" height=\"100%\" left=\"0\" top=\"0\" \
         width=\"100%\" id=\"Media\"/>\n  \
         </layout>\n \
         </head>\n \
         <body>\n  \
         <par dur=\"5000ms\">\n",
    );
    for at in attachments {
        let (elem, region) = if at.mime().starts_with("text/") {
            ("text", REGION_TEXT)
        } else if at.mime().starts_with("image/") {
            ("img", REGION_MEDIA)
        } else if at.mime().starts_with("video/") {
            ("video", REGION_MEDIA)
        } else if at.mime().starts_with("audio/") {
            ("audio", REGION_MEDIA)
        } else {
            ("ref", REGION_MEDIA)
        };
        out.push_str(&format!(
            "   <{elem} src=\"{}\" region=\"{region}\"/>\n",
            at.content_location
        ));
    }
    out.push_str("  </par>\n </body>\n</smil>\n");
    out
}

/// Cheap XML sniff for a `<smil>` document root. Magic-based detection
/// reports SMIL as plain text, so this runs on anything text-like.
pub fn file_is_smil(path: &Path) -> bool {
    let Ok(data) = std::fs::read(path) else {
        return false;
    };
    let text = String::from_utf8_lossy(&data[..data.len().min(4096)]);
    let mut rest = text.trim_start_matches('\u{feff}').trim_start();
    loop {
        if let Some(stripped) = rest.strip_prefix("<?") {
            match stripped.find("?>") {
                Some(end) => rest = stripped[end + 2..].trim_start(),
                None => return false,
            }
        } else if let Some(stripped) = rest.strip_prefix("<!--") {
            match stripped.find("-->") {
                Some(end) => rest = stripped[end + 3..].trim_start(),
                None => return false,
            }
        } else if let Some(stripped) = rest.strip_prefix("<!") {
            match stripped.find('>') {
                Some(end) => rest = stripped[end + 1..].trim_start(),
                None => return false,
            }
        } else {
            break;
        }
    }
    rest.strip_prefix("<smil")
        .is_some_and(|r| r.starts_with('>') || r.starts_with(char::is_whitespace))
}
