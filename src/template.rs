//! Prebuilt query packet mutated in place between sends.
//!
//! Layout of the buffer:
//!
//! ```text
//! 0      2                12    13                 12+name      +2      +4
//! | ID   | flags, counts  | len | sub-label | parent labels | 0 | QTYPE | QCLASS |
//! ```
//!
//! Only the ID, the sub-label octets and (optionally) QTYPE change after
//! the template is built; the length never does.

use crate::error::ShooterError;
use crate::random::{random_id, QueryRng};
use crate::wire::{
	check_name, fqdn, pack_header, pack_name, pack_question, Header, CLASS_INET, HEADER_LEN,
	MAX_LABEL_LEN,
};

/// Offset of the first sub-label octet, after its length octet
pub const SUB_LABEL_OFFSET: usize = HEADER_LEN + 1;

/// A serialized query plus the offsets of its volatile fields
#[derive(Debug, Clone, Default)]
pub struct PacketTemplate {
	bytes: Vec<u8>,
	sub_label_offset: Option<usize>,
	qtype_offset: usize,
	sub_label_len: usize,
	parent: String,
	random_type: bool,
}

impl PacketTemplate {
	/// Build the initial query for `<random sub-label>.<parent>`.
	pub fn build(
		parent: &str,
		sub_label_len: usize,
		qtype: u16,
		random_type: bool,
		rng: &mut QueryRng,
	) -> Result<Self, ShooterError> {
		if sub_label_len > MAX_LABEL_LEN {
			return Err(ShooterError::LabelTooLong {
				label: "<random>".to_string(),
				len: sub_label_len,
			});
		}
		let name = fqdn(&rng.domain(sub_label_len, parent));
		check_name(&name)?;
		let packed = pack_name(&name);

		let mut bytes = vec![0u8; HEADER_LEN + packed.len() + 4];
		let off = pack_header(&Header::query(random_id(true)), &mut bytes, 0)?;
		pack_question(&packed, qtype, CLASS_INET, &mut bytes, off)?;

		Ok(PacketTemplate {
			bytes,
			sub_label_offset: (sub_label_len > 0).then_some(SUB_LABEL_OFFSET),
			qtype_offset: HEADER_LEN + packed.len(),
			sub_label_len,
			parent: parent.to_string(),
			random_type,
		})
	}

	/// Rewrite ID, sub-label and (when enabled) QTYPE, returning the buffer.
	pub fn mutate(&mut self, rng: &mut QueryRng) -> Result<&[u8], ShooterError> {
		self.ensure_built()?;
		let id = rng.id();
		self.bytes[..2].copy_from_slice(&id.to_be_bytes());
		if let Some(start) = self.sub_label_offset {
			rng.fill_sub_label(&mut self.bytes[start..start + self.sub_label_len]);
		}
		if self.random_type {
			let qtype = rng.record_type();
			let at = self.qtype_offset;
			self.bytes[at..at + 2].copy_from_slice(&qtype.to_be_bytes());
		}
		Ok(&self.bytes)
	}

	pub fn bytes(&self) -> &[u8] {
		&self.bytes
	}

	pub fn len(&self) -> usize {
		self.bytes.len()
	}

	pub fn is_built(&self) -> bool {
		!self.bytes.is_empty()
	}

	pub fn sub_label_offset(&self) -> Option<usize> {
		self.sub_label_offset
	}

	pub fn qtype_offset(&self) -> usize {
		self.qtype_offset
	}

	pub fn sub_label_len(&self) -> usize {
		self.sub_label_len
	}

	pub fn parent(&self) -> &str {
		&self.parent
	}

	pub fn random_type(&self) -> bool {
		self.random_type
	}

	fn ensure_built(&self) -> Result<(), ShooterError> {
		if self.is_built() {
			Ok(())
		} else {
			Err(ShooterError::TemplateNotInitialized)
		}
	}
}
