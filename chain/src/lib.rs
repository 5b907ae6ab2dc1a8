//! Concrete adapters for the `Crypto` and `OnChain` ports defined in
//! `waypoint-primitives`: secp256k1 signing/recovery and a web3 JSON-RPC
//! client against the netting-channel and secret-registry contracts.

pub mod errors;
pub mod ethereum;
pub mod keys;

pub use errors::ChainError;
pub use ethereum::EthereumChain;
pub use keys::PrivateKey;
