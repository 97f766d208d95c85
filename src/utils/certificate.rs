// src/utils/certificate.rs
//! Structural checks on PEM certificates.
//!
//! Only enough DER is read to tell whether a certificate is self-issued
//! (issuer == subject) and to pull out its subject public key. Chain-of-trust
//! validation is not done here.

use pem::Pem;

const PEM_CERTIFICATE_TAG: &str = "CERTIFICATE";
const DER_SEQUENCE: u8 = 0x30;
const DER_INTEGER: u8 = 0x02;
const DER_BIT_STRING: u8 = 0x03;
const DER_VERSION: u8 = 0xa0;

/// Parses one PEM block and checks it is tagged `CERTIFICATE`.
pub fn parse_certificate(pem: &str) -> Result<Pem, String> {
    let block = pem::parse(pem).map_err(|e| e.to_string())?;
    if block.tag() != PEM_CERTIFICATE_TAG {
        return Err(format!(
            "expected a {} block, found {}",
            PEM_CERTIFICATE_TAG,
            block.tag()
        ));
    }
    if block.contents().is_empty() {
        return Err("certificate body is empty".to_string());
    }
    Ok(block)
}

/// Fields of a TBSCertificate this crate cares about, as raw DER.
struct TbsFields<'a> {
    issuer: &'a [u8],
    subject: &'a [u8],
    subject_public_key_info: &'a [u8],
}

fn tbs_fields(der: &[u8]) -> Option<TbsFields<'_>> {
    let (certificate, _) = read_tlv(der, DER_SEQUENCE)?;
    let (tbs, _) = read_tlv(certificate, DER_SEQUENCE)?;

    let mut rest = tbs;
    if rest.first() == Some(&DER_VERSION) {
        rest = skip_tlv(rest)?;
    }
    let (_, rest) = read_tlv(rest, DER_INTEGER)?; // serial
    let (_, rest) = read_tlv(rest, DER_SEQUENCE)?; // signature algorithm
    let issuer = element(rest)?;
    let rest = skip_tlv(rest)?;
    let rest = skip_tlv(rest)?; // validity
    let subject = element(rest)?;
    let rest = skip_tlv(rest)?;
    let (subject_public_key_info, _) = read_tlv(rest, DER_SEQUENCE)?;

    Some(TbsFields {
        issuer,
        subject,
        subject_public_key_info,
    })
}

/// `Some(true)` when the DER certificate names itself as issuer,
/// `None` when the structure cannot be read.
pub fn is_self_issued(der: &[u8]) -> Option<bool> {
    let fields = tbs_fields(der)?;
    Some(fields.issuer == fields.subject)
}

/// The certificate's subject public key (for RSA, the PKCS#1
/// `RSAPublicKey` DER that `ring` verifies against).
pub fn subject_public_key(der: &[u8]) -> Option<&[u8]> {
    let spki = tbs_fields(der)?.subject_public_key_info;
    let rest = skip_tlv(spki)?; // algorithm
    let (bits, _) = read_tlv(rest, DER_BIT_STRING)?;
    match bits.split_first()? {
        (0, key) => Some(key),
        _ => None,
    }
}

/// Reads a TLV of the expected tag, returning its value and what follows.
fn read_tlv(input: &[u8], tag: u8) -> Option<(&[u8], &[u8])> {
    if *input.first()? != tag {
        return None;
    }
    let (header, len) = read_length(&input[1..])?;
    let start = 1 + header;
    let end = start.checked_add(len)?;
    Some((input.get(start..end)?, &input[end..]))
}

/// Complete encoding (tag, length and value) of the next element.
fn element(input: &[u8]) -> Option<&[u8]> {
    let (header, len) = read_length(input.get(1..)?)?;
    input.get(..(1 + header).checked_add(len)?)
}

fn skip_tlv(input: &[u8]) -> Option<&[u8]> {
    let len = element(input)?.len();
    Some(&input[len..])
}

/// Returns (bytes used by the length field, content length).
fn read_length(input: &[u8]) -> Option<(usize, usize)> {
    let first = *input.first()?;
    if first < 0x80 {
        return Some((1, first as usize));
    }
    let count = (first & 0x7f) as usize;
    if count == 0 || count > 4 {
        return None;
    }
    let len = input
        .get(1..=count)?
        .iter()
        .fold(0usize, |acc, b| (acc << 8) | *b as usize);
    Some((1 + count, len))
}

/// First 64 characters of a PEM string, for logs.
pub fn abbreviate(pem: &str) -> String {
    let head: String = pem.chars().take(64).collect();
    format!("{}...", head)
}
