// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Stand-alone MMS PDU dumper: prints decoded headers and, in verbose
//! mode, hex dumps of the raw values and part bodies.
//!
//! Exit codes: 0 ok, 1 bad command line, 2 I/O error, 3 decode error.

use std::process::ExitCode;

use bytes::Bytes;
use chrono::{TimeZone, Utc};
use mms_engine_rs::codec::{
    tables,
    wsp::{
        self, HeaderIter, HeaderIterFlags, HeaderName, MultipartIter,
        ParameterIter, ValueType,
    },
};

struct Options {
    verbose: bool,
    file: String,
}

fn usage() {
    eprintln!("Usage: mms-dump [-v] FILE");
}

fn parse_args() -> Option<Options> {
    let mut verbose = false;
    let mut file = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "-v" | "--verbose" => verbose = true,
            "-h" | "--help" => return None,
            _ if arg.starts_with('-') => return None,
            _ if file.is_some() => return None,
            _ => file = Some(arg),
        }
    }
    file.map(|file| Options { verbose, file })
}

fn hex_dump(data: &[u8], indent: &str) {
    for chunk in data.chunks(16) {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
        let ascii: String = chunk
            .iter()
            .map(|b| {
                if b.is_ascii_graphic() || *b == b' ' { *b as char } else { '.' }
            })
            .collect();
        println!("{indent}{:<47}  {ascii}", hex.join(" "));
    }
}

fn format_date(secs: u64) -> String {
    Utc.timestamp_opt(secs as i64, 0)
        .single()
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| format!("{secs} s"))
}

fn format_enum(code: u8, value: u8) -> Option<String> {
    let name = match (code, value) {
        (tables::MMS_HEADER_MESSAGE_TYPE, 128) => "m-send-req",
        (tables::MMS_HEADER_MESSAGE_TYPE, 129) => "m-send-conf",
        (tables::MMS_HEADER_MESSAGE_TYPE, 130) => "m-notification-ind",
        (tables::MMS_HEADER_MESSAGE_TYPE, 131) => "m-notifyresp-ind",
        (tables::MMS_HEADER_MESSAGE_TYPE, 132) => "m-retrieve-conf",
        (tables::MMS_HEADER_MESSAGE_TYPE, 133) => "m-acknowledge-ind",
        (tables::MMS_HEADER_MESSAGE_TYPE, 134) => "m-delivery-ind",
        (tables::MMS_HEADER_MESSAGE_TYPE, 135) => "m-read-rec-ind",
        (tables::MMS_HEADER_MESSAGE_TYPE, 136) => "m-read-orig-ind",
        (tables::MMS_HEADER_PRIORITY, 128) => "Low",
        (tables::MMS_HEADER_PRIORITY, 129) => "Normal",
        (tables::MMS_HEADER_PRIORITY, 130) => "High",
        (tables::MMS_HEADER_MESSAGE_CLASS, 128) => "Personal",
        (tables::MMS_HEADER_MESSAGE_CLASS, 129) => "Advertisement",
        (tables::MMS_HEADER_MESSAGE_CLASS, 130) => "Informational",
        (tables::MMS_HEADER_MESSAGE_CLASS, 131) => "Auto",
        (tables::MMS_HEADER_READ_STATUS, 128) => "Read",
        (tables::MMS_HEADER_READ_STATUS, 129) => "Deleted",
        (tables::MMS_HEADER_SENDER_VISIBILITY, 128) => "Hide",
        (tables::MMS_HEADER_SENDER_VISIBILITY, 129) => "Show",
        (tables::MMS_HEADER_STATUS, 128) => "Expired",
        (tables::MMS_HEADER_STATUS, 129) => "Retrieved",
        (tables::MMS_HEADER_STATUS, 130) => "Rejected",
        (tables::MMS_HEADER_STATUS, 131) => "Deferred",
        (tables::MMS_HEADER_STATUS, 132) => "Unrecognised",
        (tables::MMS_HEADER_STATUS, 133) => "Indeterminate",
        (tables::MMS_HEADER_STATUS, 134) => "Forwarded",
        (tables::MMS_HEADER_STATUS, 135) => "Unreachable",
        (tables::MMS_HEADER_RESPONSE_STATUS, 128)
        | (tables::MMS_HEADER_RETRIEVE_STATUS, 128) => "Ok",
        (
            tables::MMS_HEADER_DELIVERY_REPORT
            | tables::MMS_HEADER_READ_REPORT
            | tables::MMS_HEADER_REPORT_ALLOWED,
            128,
        ) => "Yes",
        (
            tables::MMS_HEADER_DELIVERY_REPORT
            | tables::MMS_HEADER_READ_REPORT
            | tables::MMS_HEADER_REPORT_ALLOWED,
            129,
        ) => "No",
        _ => return None,
    };
    Some(name.to_string())
}

fn long_value_u64(value: &[u8]) -> u64 {
    let mut out = 0u64;
    for b in value.iter().take(8) {
        out = (out << 8) | u64::from(*b);
    }
    out
}

fn format_value(code: u8, value: &[u8], value_type: ValueType) -> String {
    match value_type {
        ValueType::Short => {
            let v = value.first().copied().unwrap_or(0);
            if code == tables::MMS_HEADER_MMS_VERSION {
                return format!("{}.{}", (v & 0x70) >> 4, v & 0x0f);
            }
            format_enum(code, v).unwrap_or_else(|| format!("0x{v:02X}"))
        },
        ValueType::Text => match wsp::decode_text_string(value) {
            Ok((s, _)) => s.to_string(),
            Err(_) => format!("<{} bytes>", value.len()),
        },
        ValueType::Long => match code {
            tables::MMS_HEADER_DATE => format_date(long_value_u64(value)),
            tables::MMS_HEADER_EXPIRY | tables::MMS_HEADER_DELIVERY_TIME => {
                match value.first() {
                    Some(0x80) => {
                        let date = wsp::decode_long_integer(&value[1..])
                            .map(|(v, _)| v)
                            .unwrap_or(0);
                        format!("{} (absolute)", format_date(date))
                    },
                    Some(0x81) => {
                        let secs = wsp::decode_long_integer(&value[1..])
                            .map(|(v, _)| v)
                            .unwrap_or(0);
                        format!("{secs} s (relative)")
                    },
                    _ => format!("<{} bytes>", value.len()),
                }
            },
            tables::MMS_HEADER_FROM => match value.first() {
                Some(0x81) => "<insert address>".to_string(),
                Some(0x80) => wsp::decode_text_string(&value[1..])
                    .map(|(s, _)| s.to_string())
                    .unwrap_or_else(|_| format!("<{} bytes>", value.len())),
                _ => format!("<{} bytes>", value.len()),
            },
            tables::MMS_HEADER_MESSAGE_SIZE
            | tables::MMS_HEADER_REPLY_CHARGING_SIZE => {
                format!("{}", long_value_u64(value))
            },
            tables::MMS_HEADER_SUBJECT
            | tables::MMS_HEADER_RESPONSE_TEXT
            | tables::MMS_HEADER_RETRIEVE_TEXT
            | tables::MMS_HEADER_TO
            | tables::MMS_HEADER_CC
            | tables::MMS_HEADER_BCC => {
                wsp::decode_encoded_string(value, ValueType::Long)
                    .unwrap_or_else(|_| format!("<{} bytes>", value.len()))
            },
            _ => format!("<{} bytes>", value.len()),
        },
    }
}

fn dump_headers(iter: &mut HeaderIter, verbose: bool) -> Result<(), String> {
    loop {
        let field = match iter.next_field() {
            Ok(Some(field)) => field,
            Ok(None) => return Ok(()),
            Err(e) => return Err(e.to_string()),
        };
        match field.name {
            HeaderName::WellKnown(code) => {
                let name = tables::header_name(code)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("0x{code:02X}"));
                println!(
                    "{name}: {}",
                    format_value(code, field.value, field.value_type)
                );
            },
            HeaderName::Application(name) => {
                let value = match field.value_type {
                    ValueType::Text => wsp::decode_text_string(field.value)
                        .map(|(s, _)| s.to_string())
                        .unwrap_or_default(),
                    _ => format!("<{} bytes>", field.value.len()),
                };
                println!("{name}: {value}");
            },
        }
        if verbose {
            hex_dump(field.value, "    ");
        }
    }
}

fn dump_multipart(iter: &mut HeaderIter, verbose: bool) -> Result<(), String> {
    let (mut parts, outer_ct) =
        MultipartIter::init(iter).map_err(|e| e.to_string())?;
    let ct = wsp::decode_content_type(outer_ct).map_err(|e| e.to_string())?;
    println!("Content-Type: {}", ct.media);

    let mut index = 0;
    loop {
        let part = match parts.next_part().map_err(|e| e.to_string())? {
            Some(part) => part,
            None => break,
        };
        let ct = wsp::decode_content_type(part.content_type)
            .map_err(|e| e.to_string())?;
        let charset = ParameterIter::find_charset(ct.params);
        println!("Part {index}:");
        match charset {
            Some(cs) => println!("  Content-Type: {};charset={cs}", ct.media),
            None => println!("  Content-Type: {}", ct.media),
        }

        let mut headers = HeaderIter::new(part.headers, HeaderIterFlags::empty());
        while let Some(field) =
            headers.next_field().map_err(|e| e.to_string())?
        {
            if let HeaderName::WellKnown(code) = field.name {
                if let Some(name) = tables::part_header_name(code) {
                    let value = match field.value_type {
                        ValueType::Text => wsp::decode_text_string(field.value)
                            .map(|(s, _)| s.to_string())
                            .unwrap_or_default(),
                        _ => format!("<{} bytes>", field.value.len()),
                    };
                    println!("  {name}: {value}");
                }
            }
        }

        println!("  Body: {} bytes at offset {}", part.body.len(), part.body_offset);
        if verbose {
            hex_dump(part.body, "    ");
        }
        index += 1;
    }

    parts.close(iter).map_err(|e| e.to_string())
}

fn run(opts: &Options) -> Result<(), (u8, String)> {
    let data = std::fs::read(&opts.file)
        .map_err(|e| (2, format!("{}: {e}", opts.file)))?;
    let data = Bytes::from(data);

    let mut iter = HeaderIter::new(
        &data,
        HeaderIterFlags::REJECT_CP | HeaderIterFlags::DETECT_MMS_MULTIPART,
    );
    dump_headers(&mut iter, opts.verbose).map_err(|e| (3, e))?;
    if iter.is_multipart() {
        dump_multipart(&mut iter, opts.verbose).map_err(|e| (3, e))?;
    }
    if !iter.at_end() {
        return Err((3, "trailing garbage after headers".to_string()));
    }
    Ok(())
}

fn main() -> ExitCode {
    let Some(opts) = parse_args() else {
        usage();
        return ExitCode::from(1);
    };
    match run(&opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err((code, message)) => {
            eprintln!("mms-dump: {message}");
            ExitCode::from(code)
        },
    }
}
