//
// Copyright (c) The SLP Directory Agent Contributors
//
// SPDX-License-Identifier: MIT
//

//! SLPv2 wire codec (RFC 2608 §8). The core only consumes and produces
//! decoded message shapes (`slp_da_core::message`); this module is the
//! external collaborator that bridges them to bytes on the wire.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use slp_da_core::attr::{AttrEntry, AttrValue, Attributes};
use slp_da_core::message::{
    DaAdvert, MessageBody, SrvAck, SrvDeReg, SrvReg, SrvRply, SrvRqst, UrlEntry,
};
use slp_da_core::scope::Scopes;
use slp_da_core::url::{ServiceType, ServiceUrl};

const VERSION: u8 = 2;

const FN_SRV_RQST: u8 = 1;
const FN_SRV_RPLY: u8 = 2;
const FN_SRV_REG: u8 = 3;
const FN_SRV_DEREG: u8 = 4;
const FN_SRV_ACK: u8 = 5;
const FN_DA_ADVERT: u8 = 8;

const FLAG_OVERFLOW: u16 = 0x8000;
const FLAG_FRESH: u16 = 0x4000;
const FLAG_MULTICAST: u16 = 0x2000;

/// A decoded SLPv2 message, header fields plus body.
#[derive(Debug)]
pub struct Pdu {
    pub xid: u16,
    pub language: String,
    pub is_multicast: bool,
    pub body: MessageBody,
}

#[derive(Debug)]
pub enum PduError {
    Truncated,
    UnsupportedVersion(u8),
    UnsupportedFunction(u8),
    InvalidUtf8,
}

impl std::fmt::Display for PduError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PduError::Truncated => write!(f, "truncated SLPv2 PDU"),
            PduError::UnsupportedVersion(v) => write!(f, "unsupported SLPv2 version {v}"),
            PduError::UnsupportedFunction(id) => write!(f, "unsupported function-id {id}"),
            PduError::InvalidUtf8 => write!(f, "non-UTF-8 string field"),
        }
    }
}

impl std::error::Error for PduError {}

/// Decodes one SLPv2 PDU off the wire (RFC 2608 §8.1).
pub fn decode(buf: &[u8]) -> Result<Pdu, PduError> {
    let mut cur = Bytes::copy_from_slice(buf);
    if cur.remaining() < 16 {
        return Err(PduError::Truncated);
    }

    let version = cur.get_u8();
    if version != VERSION {
        return Err(PduError::UnsupportedVersion(version));
    }
    let function_id = cur.get_u8();
    let _length = get_u24(&mut cur)?;
    let flags = cur.get_u16();
    let _next_ext_offset = get_u24(&mut cur)?;
    let xid = cur.get_u16();
    let language = get_string16(&mut cur)?;
    let is_multicast = flags & FLAG_MULTICAST != 0;
    let is_fresh = flags & FLAG_FRESH != 0;

    let body = match function_id {
        FN_SRV_RQST => MessageBody::SrvRqst(decode_srv_rqst(&mut cur, xid, &language)?),
        FN_SRV_REG => MessageBody::SrvReg(decode_srv_reg(&mut cur, xid, &language, is_fresh)?),
        FN_SRV_DEREG => MessageBody::SrvDeReg(decode_srv_dereg(&mut cur, xid, &language)?),
        FN_SRV_RPLY | FN_SRV_ACK | FN_DA_ADVERT => MessageBody::Other,
        other => return Err(PduError::UnsupportedFunction(other)),
    };

    Ok(Pdu { xid, language, is_multicast, body })
}

fn decode_srv_rqst(cur: &mut Bytes, xid: u16, language: &str) -> Result<SrvRqst, PduError> {
    let previous_responders = get_string16(cur)?
        .split(',')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    let service_type = ServiceType::new(get_string16(cur)?);
    let scopes = parse_scope_list(&get_string16(cur)?);
    let filter = get_string16(cur)?;
    let _spi = get_string16(cur)?;
    Ok(SrvRqst {
        xid,
        language: language.to_string(),
        service_type,
        scopes,
        filter,
        previous_responders,
    })
}

fn decode_srv_reg(
    cur: &mut Bytes,
    xid: u16,
    language: &str,
    is_fresh: bool,
) -> Result<SrvReg, PduError> {
    let url = decode_url_entry(cur)?;
    let service_type = ServiceType::new(get_string16(cur)?);
    let scopes = parse_scope_list(&get_string16(cur)?);
    let attributes = parse_attr_list(&get_string16(cur)?);
    let _auth_count = if cur.has_remaining() { cur.get_u8() } else { 0 };
    Ok(SrvReg {
        xid,
        language: language.to_string(),
        url: ServiceUrl::new(url.0, url.1),
        service_type,
        scopes,
        attributes,
        is_fresh,
    })
}

fn decode_srv_dereg(cur: &mut Bytes, xid: u16, language: &str) -> Result<SrvDeReg, PduError> {
    let scopes = parse_scope_list(&get_string16(cur)?);
    let url = decode_url_entry(cur)?;
    let tag_list = get_string16(cur)?;
    let is_updating = !tag_list.is_empty();
    let attribute_tags = parse_tag_list(&tag_list);
    Ok(SrvDeReg {
        xid,
        language: language.to_string(),
        url: ServiceUrl::new(url.0, url.1),
        scopes,
        is_updating,
        attribute_tags,
    })
}

fn decode_url_entry(cur: &mut Bytes) -> Result<(String, u16), PduError> {
    let _reserved = cur.get_u8();
    let lifetime = cur.get_u16();
    let url = get_string16(cur)?;
    let _num_auths = cur.get_u8();
    Ok((url, lifetime))
}

fn parse_scope_list(raw: &str) -> Scopes {
    Scopes::new(raw.split(',').filter(|s| !s.is_empty()))
}

/// Parses the wire attribute-list string form `(tag=v1,v2),(flag)`
/// into [`Attributes`] (§3).
fn parse_attr_list(raw: &str) -> Attributes {
    let mut attrs = Attributes::new();
    for entry in split_parenthesized(raw) {
        let Some((tag, values)) = entry.split_once('=') else {
            attrs.set_flag(entry);
            continue;
        };
        let values = values
            .split(',')
            .map(parse_attr_value)
            .collect::<Vec<_>>();
        attrs.set_values(tag, values);
    }
    attrs
}

fn split_parenthesized(raw: &str) -> Vec<&str> {
    raw.split("),(")
        .map(|s| s.trim_start_matches('(').trim_end_matches(')'))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parses a SrvDeReg tag-list, the same `(tag),(tag=value)` wire syntax
/// as an attribute list, down to bare tag names (§4.3 partial
/// deregistration).
fn parse_tag_list(raw: &str) -> Vec<String> {
    split_parenthesized(raw)
        .into_iter()
        .map(|entry| entry.split_once('=').map_or(entry, |(tag, _)| tag).to_string())
        .collect()
}

fn parse_attr_value(raw: &str) -> AttrValue {
    if let Ok(i) = raw.parse::<i64>() {
        AttrValue::Integer(i)
    } else if let Ok(b) = raw.parse::<bool>() {
        AttrValue::Bool(b)
    } else {
        AttrValue::String(raw.to_string())
    }
}

fn get_u24(cur: &mut Bytes) -> Result<u32, PduError> {
    if cur.remaining() < 3 {
        return Err(PduError::Truncated);
    }
    let b0 = cur.get_u8() as u32;
    let b1 = cur.get_u8() as u32;
    let b2 = cur.get_u8() as u32;
    Ok((b0 << 16) | (b1 << 8) | b2)
}

fn put_u24(buf: &mut BytesMut, value: u32) {
    buf.put_u8(((value >> 16) & 0xFF) as u8);
    buf.put_u8(((value >> 8) & 0xFF) as u8);
    buf.put_u8((value & 0xFF) as u8);
}

fn get_string16(cur: &mut Bytes) -> Result<String, PduError> {
    if cur.remaining() < 2 {
        return Err(PduError::Truncated);
    }
    let len = cur.get_u16() as usize;
    if cur.remaining() < len {
        return Err(PduError::Truncated);
    }
    let bytes = cur.copy_to_bytes(len);
    String::from_utf8(bytes.to_vec()).map_err(|_| PduError::InvalidUtf8)
}

fn put_string16(buf: &mut BytesMut, s: &str) {
    buf.put_u16(s.len() as u16);
    buf.put_slice(s.as_bytes());
}

fn header(function_id: u8, xid: u16, language: &str, flags: u16, body: &[u8]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(16 + language.len() + body.len());
    buf.put_u8(VERSION);
    buf.put_u8(function_id);
    put_u24(&mut buf, (16 + language.len() + body.len()) as u32);
    buf.put_u16(flags);
    put_u24(&mut buf, 0);
    buf.put_u16(xid);
    put_string16(&mut buf, language);
    buf.put_slice(body);
    buf
}

fn encode_scope_list(scopes: &Scopes) -> String {
    scopes.iter().collect::<Vec<_>>().join(",")
}

fn encode_attr_list(attrs: &Attributes) -> String {
    attrs
        .iter()
        .map(|(tag, entry)| match entry {
            AttrEntry::Flag => format!("({tag})"),
            AttrEntry::Values(values) => {
                let joined = values.iter().map(AttrValue::to_string).collect::<Vec<_>>().join(",");
                format!("({tag}={joined})")
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Encodes a `SrvRply` for transmission (RFC 2608 §8.8).
pub fn encode_srv_rply(rply: &SrvRply) -> BytesMut {
    let mut body = BytesMut::new();
    body.put_u16(rply.error_code);
    body.put_u16(rply.urls.len() as u16);
    for entry in &rply.urls {
        encode_url_entry(&mut body, entry);
    }
    header(FN_SRV_RPLY, rply.xid, &rply.language, 0, &body)
}

/// Encodes a `SrvAck` (RFC 2608 §8.10).
pub fn encode_srv_ack(ack: &SrvAck) -> BytesMut {
    let mut body = BytesMut::new();
    body.put_u16(ack.error_code);
    header(FN_SRV_ACK, ack.xid, &ack.language, 0, &body)
}

/// Encodes a `DAAdvert`, unicast or multicast depending on `multicast`
/// (RFC 2608 §8.5).
pub fn encode_da_advert(advert: &DaAdvert, multicast: bool) -> BytesMut {
    let mut body = BytesMut::new();
    body.put_u16(advert.error_code);
    body.put_u32(advert.boot_time);
    put_string16(&mut body, &advert.url);
    put_string16(&mut body, &encode_scope_list(&advert.scopes));
    put_string16(&mut body, &encode_attr_list(&advert.attributes));
    put_string16(&mut body, "");
    body.put_u8(0);

    let flags = if multicast { FLAG_MULTICAST } else { 0 };
    header(FN_DA_ADVERT, advert.xid, &advert.language, flags, &body)
}

fn encode_url_entry(buf: &mut BytesMut, entry: &UrlEntry) {
    buf.put_u8(0);
    buf.put_u16(entry.lifetime);
    put_string16(buf, &entry.url);
    buf.put_u8(0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use slp_da_core::error::ERR_SUCCESS;

    #[test]
    fn srv_rqst_round_trips_through_decode() {
        let mut body = BytesMut::new();
        put_string16(&mut body, "");
        put_string16(&mut body, "service:printer");
        put_string16(&mut body, "DEFAULT");
        put_string16(&mut body, "(ppm>=5)");
        put_string16(&mut body, "");
        let pdu = header(FN_SRV_RQST, 42, "en", FLAG_MULTICAST, &body);

        let decoded = decode(&pdu).unwrap();
        assert_eq!(decoded.xid, 42);
        assert_eq!(decoded.language, "en");
        assert!(decoded.is_multicast);
        match decoded.body {
            MessageBody::SrvRqst(req) => {
                assert_eq!(req.xid, 42);
                assert_eq!(req.language, "en");
                assert_eq!(req.service_type.as_str(), "service:printer");
                assert_eq!(req.filter, "(ppm>=5)");
            }
            _ => panic!("expected SrvRqst"),
        }
    }

    #[test]
    fn srv_rply_encodes_url_entries() {
        let rply = SrvRply {
            xid: 7,
            language: "en".to_string(),
            error_code: ERR_SUCCESS,
            urls: vec![UrlEntry {
                url: "service:printer://p1".to_string(),
                lifetime: 60,
            }],
        };
        let encoded = encode_srv_rply(&rply);
        assert_eq!(encoded[1], FN_SRV_RPLY);
    }

    #[test]
    fn attr_list_parses_flags_and_typed_values() {
        let attrs = parse_attr_list("(color),(ppm=10),(location=floor2)");
        assert!(attrs.contains_tag("color"));
        assert!(matches!(attrs.get("ppm"), Some(AttrEntry::Values(v)) if v == &vec![AttrValue::Integer(10)]));
        assert!(attrs.contains_tag("location"));
    }

    #[test]
    fn truncated_pdu_is_rejected() {
        assert!(matches!(decode(&[2, 1, 0]), Err(PduError::Truncated)));
    }

    #[test]
    fn srv_dereg_tag_list_strips_parens() {
        assert_eq!(
            parse_tag_list("(color),(ppm=10)"),
            vec!["color".to_string(), "ppm".to_string()]
        );
    }

    #[test]
    fn srv_dereg_round_trips_partial_deregistration_tags() {
        let mut body = BytesMut::new();
        put_string16(&mut body, "DEFAULT");
        body.put_u8(0);
        body.put_u16(60);
        put_string16(&mut body, "service:printer://p1");
        body.put_u8(0);
        put_string16(&mut body, "(color),(ppm=10)");
        let pdu = header(FN_SRV_DEREG, 5, "en", 0, &body);

        let decoded = decode(&pdu).unwrap();
        match decoded.body {
            MessageBody::SrvDeReg(dereg) => {
                assert!(dereg.is_updating);
                assert_eq!(dereg.attribute_tags, vec!["color".to_string(), "ppm".to_string()]);
            }
            _ => panic!("expected SrvDeReg"),
        }
    }
}
