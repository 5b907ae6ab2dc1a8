use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
	#[error("json-rpc error: {0}")]
	Rpc(#[from] web3::Error),

	#[error("contract error: {0}")]
	Contract(#[from] web3::contract::Error),

	#[error("abi error: {0}")]
	Abi(#[from] ethabi::Error),
}
