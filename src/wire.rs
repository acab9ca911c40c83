//! DNS wire codec for outbound queries.
//!
//! Only what the shooter emits is covered: a 12-octet header and a single
//! uncompressed question. Responses are never decoded.

use crate::error::ShooterError;

/// Size of the fixed DNS header in octets
pub const HEADER_LEN: usize = 12;

/// QTYPE of an A record
pub const TYPE_A: u16 = 1;

/// QCLASS of the Internet class
pub const CLASS_INET: u16 = 1;

/// Longest label RFC 1035 allows
pub const MAX_LABEL_LEN: usize = 63;

/// Longest packed name RFC 1035 allows
pub const MAX_NAME_LEN: usize = 255;

const QR: u16 = 1 << 15;
const AA: u16 = 1 << 10;
const TC: u16 = 1 << 9;
const RD: u16 = 1 << 8;
const RA: u16 = 1 << 7;
const Z: u16 = 1 << 6;
const AD: u16 = 1 << 5;
const CD: u16 = 1 << 4;

/// Logical DNS header with the flags split out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
	pub id: u16,
	pub response: bool,
	pub opcode: u8,
	pub authoritative: bool,
	pub truncated: bool,
	pub recursion_desired: bool,
	pub recursion_available: bool,
	pub zero: bool,
	pub authenticated_data: bool,
	pub checking_disabled: bool,
	pub rcode: u8,
	pub qdcount: u16,
	pub ancount: u16,
	pub nscount: u16,
	pub arcount: u16,
}

impl Header {
	/// Header of a plain recursive query carrying one question.
	pub fn query(id: u16) -> Self {
		Header {
			id,
			recursion_desired: true,
			qdcount: 1,
			..Header::default()
		}
	}

	/// Combine opcode, rcode and the boolean flags into the 16-bit flags word.
	pub fn bits(&self) -> u16 {
		let mut bits = (u16::from(self.opcode & 0x0f) << 11) | u16::from(self.rcode & 0x0f);
		let flags = [
			(self.response, QR),
			(self.authoritative, AA),
			(self.truncated, TC),
			(self.recursion_desired, RD),
			(self.recursion_available, RA),
			(self.zero, Z),
			(self.authenticated_data, AD),
			(self.checking_disabled, CD),
		];
		for (set, mask) in flags {
			if set {
				bits |= mask;
			}
		}
		bits
	}
}

/// Write `value` big-endian at `offset`, returning the offset after it.
pub fn pack_u16(value: u16, buf: &mut [u8], offset: usize) -> Result<usize, ShooterError> {
	let end = offset + 2;
	if end > buf.len() {
		return Err(ShooterError::BufferOverflow {
			needed: 2,
			available: buf.len().saturating_sub(offset),
		});
	}
	buf[offset..end].copy_from_slice(&value.to_be_bytes());
	Ok(end)
}

/// Write the six header fields at `offset`, returning the offset after them.
pub fn pack_header(header: &Header, buf: &mut [u8], offset: usize) -> Result<usize, ShooterError> {
	let available = buf.len().saturating_sub(offset);
	if available < HEADER_LEN {
		return Err(ShooterError::BufferOverflow { needed: HEADER_LEN, available });
	}
	let mut off = pack_u16(header.id, buf, offset)?;
	off = pack_u16(header.bits(), buf, off)?;
	off = pack_u16(header.qdcount, buf, off)?;
	off = pack_u16(header.ancount, buf, off)?;
	off = pack_u16(header.nscount, buf, off)?;
	pack_u16(header.arcount, buf, off)
}

/// Copy a packed name followed by QTYPE and QCLASS at `offset`.
pub fn pack_question(
	packed_name: &[u8],
	qtype: u16,
	qclass: u16,
	buf: &mut [u8],
	offset: usize,
) -> Result<usize, ShooterError> {
	let needed = packed_name.len() + 4;
	let available = buf.len().saturating_sub(offset);
	if available < needed {
		return Err(ShooterError::BufferOverflow { needed, available });
	}
	let name_end = offset + packed_name.len();
	buf[offset..name_end].copy_from_slice(packed_name);
	let off = pack_u16(qtype, buf, name_end)?;
	pack_u16(qclass, buf, off)
}

/// Append a trailing dot unless the name already has one; "" becomes ".".
pub fn fqdn(name: &str) -> String {
	if name.ends_with('.') {
		name.to_string()
	} else {
		format!("{}.", name)
	}
}

/// Pack a fully-qualified name into length-prefixed labels ending in a zero octet.
///
/// Empty segments (the root after the trailing dot) contribute nothing but
/// the terminator, so "." packs to a single zero octet. No compression.
pub fn pack_name(fqdn: &str) -> Vec<u8> {
	let mut packed = Vec::with_capacity(fqdn.len() + 2);
	for label in fqdn.split('.').filter(|l| !l.is_empty()) {
		packed.push(label.len() as u8);
		packed.extend_from_slice(label.as_bytes());
	}
	packed.push(0);
	packed
}

/// Check label and total name lengths before packing.
pub fn check_name(fqdn: &str) -> Result<(), ShooterError> {
	let mut len = 1;
	for label in fqdn.split('.').filter(|l| !l.is_empty()) {
		if label.len() > MAX_LABEL_LEN {
			return Err(ShooterError::LabelTooLong {
				label: label.to_string(),
				len: label.len(),
			});
		}
		len += label.len() + 1;
	}
	if len > MAX_NAME_LEN {
		return Err(ShooterError::NameTooLong { len });
	}
	Ok(())
}
