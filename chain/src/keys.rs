use ethsign::SecretKey;
use tiny_keccak::{
	Hasher,
	Keccak,
};
use waypoint_primitives::{
	ports::Crypto,
	types::{
		Address,
		Signature,
	},
};
use web3::signing::{
	self,
	Key,
};

/// Wraps a secp256k1 private key and implements both `web3::signing::Key`
/// (for raw transaction signing) and this node's own `Crypto` port (for
/// signing/recovering the raw bytes that go over the wire).
#[derive(Clone)]
pub struct PrivateKey {
	inner: SecretKey,
}

impl PrivateKey {
	pub fn new(inner: SecretKey) -> Self {
		Self { inner }
	}

	pub fn from_raw(bytes: &[u8]) -> Result<Self, ethsign::Error> {
		Ok(Self { inner: SecretKey::from_raw(bytes)? })
	}
}

impl Key for PrivateKey {
	fn sign(
		&self,
		message: &[u8],
		chain_id: Option<u64>,
	) -> Result<signing::Signature, signing::SigningError> {
		let signature =
			self.inner.sign(message).map_err(|_| signing::SigningError::InvalidMessage)?;

		let standard_v = signature.v as u64;
		let v = if let Some(chain_id) = chain_id { standard_v + 35 + chain_id * 2 } else { standard_v + 27 };
		Ok(signing::Signature { r: web3::types::H256::from(signature.r), s: web3::types::H256::from(signature.s), v })
	}

	fn sign_message(&self, message: &[u8]) -> Result<signing::Signature, signing::SigningError> {
		let prefix_msg = "\x19Ethereum Signed Message:\n";
		let len_str = message.len().to_string();
		let mut res: Vec<u8> = Vec::new();
		res.append(&mut prefix_msg.as_bytes().to_vec());
		res.append(&mut len_str.as_bytes().to_vec());
		res.append(&mut message.to_vec());

		let mut keccak = Keccak::v256();
		let mut result = [0u8; 32];
		keccak.update(&res);
		keccak.finalize(&mut result);

		let signature = self.inner.sign(&result).map_err(|_| signing::SigningError::InvalidMessage)?;

		Ok(signing::Signature {
			r: web3::types::H256::from(signature.r),
			s: web3::types::H256::from(signature.s),
			v: signature.v as u64 + 27,
		})
	}

	fn address(&self) -> Address {
		Address::from(self.inner.public().address())
	}
}

/// `r || s || recovery_id` — the 65-byte raw form signed/verified over the
/// wire, distinct from `web3::signing::Signature`'s RLP-oriented `v`.
fn raw_bytes(signature: &signing::Signature) -> Vec<u8> {
	let mut bytes = Vec::with_capacity(65);
	bytes.extend_from_slice(signature.r.as_bytes());
	bytes.extend_from_slice(signature.s.as_bytes());
	bytes.push((signature.v % 27) as u8);
	bytes
}

impl Crypto for PrivateKey {
	fn sign(&self, message: &[u8]) -> Signature {
		let signature = Key::sign_message(self, message).expect("signing with a loaded key never fails");
		Signature(raw_bytes(&signature))
	}

	fn recover(&self, message: &[u8], signature: &Signature) -> Option<Address> {
		if signature.0.len() != 65 {
			return None
		}
		let recovery_id = signature.0[64] as i32;
		signing::recover(message, &signature.0[..64], recovery_id).ok()
	}

	fn address(&self) -> Address {
		Key::address(self)
	}
}
