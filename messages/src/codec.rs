//! Hand-rolled binary codec for wire messages: fixed-width fields encoded
//! big-endian (matching the on-chain ABI packing), variable-length fields
//! (secret, signature) length-prefixed with a `u16`.

use waypoint_primitives::types::{
	Address,
	Bytes,
	H256,
	U256,
};

use crate::error::MessageError;

pub struct Writer {
	buf: Vec<u8>,
}

impl Writer {
	pub fn new() -> Self {
		Self { buf: Vec::with_capacity(256) }
	}

	pub fn u8(&mut self, value: u8) {
		self.buf.push(value);
	}

	pub fn u64(&mut self, value: u64) {
		self.buf.extend_from_slice(&value.to_be_bytes());
	}

	pub fn u256(&mut self, value: U256) {
		let mut bytes = [0u8; 32];
		value.to_big_endian(&mut bytes);
		self.buf.extend_from_slice(&bytes);
	}

	pub fn address(&mut self, value: Address) {
		self.buf.extend_from_slice(value.as_bytes());
	}

	pub fn h256(&mut self, value: H256) {
		self.buf.extend_from_slice(value.as_bytes());
	}

	pub fn bytes(&mut self, value: &Bytes) {
		let len = value.0.len() as u16;
		self.buf.extend_from_slice(&len.to_be_bytes());
		self.buf.extend_from_slice(&value.0);
	}

	pub fn into_vec(self) -> Vec<u8> {
		self.buf
	}
}

impl Default for Writer {
	fn default() -> Self {
		Self::new()
	}
}

pub struct Reader<'a> {
	buf: &'a [u8],
	pos: usize,
}

impl<'a> Reader<'a> {
	pub fn new(buf: &'a [u8]) -> Self {
		Self { buf, pos: 0 }
	}

	fn take(&mut self, len: usize, field: &'static str) -> Result<&'a [u8], MessageError> {
		if self.pos + len > self.buf.len() {
			return Err(MessageError::Truncated(field))
		}
		let slice = &self.buf[self.pos..self.pos + len];
		self.pos += len;
		Ok(slice)
	}

	pub fn u8(&mut self, field: &'static str) -> Result<u8, MessageError> {
		Ok(self.take(1, field)?[0])
	}

	pub fn u64(&mut self, field: &'static str) -> Result<u64, MessageError> {
		let slice = self.take(8, field)?;
		Ok(u64::from_be_bytes(slice.try_into().expect("8-byte slice")))
	}

	pub fn u256(&mut self, field: &'static str) -> Result<U256, MessageError> {
		let slice = self.take(32, field)?;
		Ok(U256::from_big_endian(slice))
	}

	pub fn address(&mut self, field: &'static str) -> Result<Address, MessageError> {
		let slice = self.take(20, field)?;
		Ok(Address::from_slice(slice))
	}

	pub fn h256(&mut self, field: &'static str) -> Result<H256, MessageError> {
		let slice = self.take(32, field)?;
		Ok(H256::from_slice(slice))
	}

	pub fn bytes(&mut self, field: &'static str) -> Result<Bytes, MessageError> {
		let len_bytes = self.take(2, field)?;
		let len = u16::from_be_bytes(len_bytes.try_into().expect("2-byte slice")) as usize;
		Ok(Bytes(self.take(len, field)?.to_vec()))
	}

	pub fn remaining(&self) -> &'a [u8] {
		&self.buf[self.pos..]
	}
}
