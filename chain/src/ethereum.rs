use async_trait::async_trait;
use waypoint_primitives::{
	ports::OnChain,
	types::{
		Address,
		BlockNumber,
		ChannelIdentifier,
		Locksroot,
		Secret,
		SecretHash,
		TokenAddress,
		TokenAmount,
	},
};
use web3::{
	contract::{
		Contract,
		Options,
	},
	transports::Http,
	Web3,
};

use crate::{
	errors::ChainError,
	keys::PrivateKey,
};

const TOKEN_NETWORK_ABI: &str = r#"[
	{"type":"function","name":"closeChannel","stateMutability":"nonpayable",
	 "inputs":[{"name":"channel_identifier","type":"uint256"}],"outputs":[]},
	{"type":"function","name":"withdraw","stateMutability":"nonpayable",
	 "inputs":[{"name":"channel_identifier","type":"uint256"},
	           {"name":"secret","type":"bytes32"},
	           {"name":"secret_hash","type":"bytes32"}],"outputs":[]},
	{"type":"function","name":"settleChannel","stateMutability":"nonpayable",
	 "inputs":[{"name":"channel_identifier","type":"uint256"},
	           {"name":"token_address","type":"address"},
	           {"name":"our_locksroot","type":"bytes32"},
	           {"name":"partner_locksroot","type":"bytes32"}],"outputs":[]},
	{"type":"function","name":"getChannelParticipantBalance","stateMutability":"view",
	 "inputs":[{"name":"channel_identifier","type":"uint256"}],
	 "outputs":[{"name":"balance","type":"uint256"}]}
]"#;

const SECRET_REGISTRY_ABI: &str = r#"[
	{"type":"function","name":"registerSecret","stateMutability":"nonpayable",
	 "inputs":[{"name":"secret","type":"bytes32"}],"outputs":[]}
]"#;

/// Thin `OnChain` adapter: one `TokenNetwork` contract and one
/// `SecretRegistry` contract reached over a single JSON-RPC endpoint.
/// Simplification noted in the design ledger — a node that participates in
/// more than one token network needs one adapter per network.
pub struct EthereumChain {
	web3: Web3<Http>,
	key: PrivateKey,
	token_network_address: Address,
	secret_registry_address: Address,
}

impl EthereumChain {
	pub fn new(
		rpc_url: &str,
		key: PrivateKey,
		token_network_address: Address,
		secret_registry_address: Address,
	) -> Result<Self, ChainError> {
		let transport = Http::new(rpc_url)?;
		Ok(Self { web3: Web3::new(transport), key, token_network_address, secret_registry_address })
	}

	fn token_network_contract(&self) -> Result<Contract<Http>, ChainError> {
		Ok(Contract::from_json(self.web3.eth(), self.token_network_address, TOKEN_NETWORK_ABI.as_bytes())?)
	}

	fn secret_registry_contract(&self) -> Result<Contract<Http>, ChainError> {
		Ok(Contract::from_json(self.web3.eth(), self.secret_registry_address, SECRET_REGISTRY_ABI.as_bytes())?)
	}
}

#[async_trait]
impl OnChain for EthereumChain {
	type Error = ChainError;

	async fn close_channel(&self, channel_identifier: ChannelIdentifier, _token_address: TokenAddress) -> Result<(), Self::Error> {
		let contract = self.token_network_contract()?;
		contract
			.signed_call("closeChannel", (channel_identifier,), Options::default(), &self.key)
			.await?;
		Ok(())
	}

	async fn withdraw(&self, channel_identifier: ChannelIdentifier, secret: Secret, secret_hash: SecretHash) -> Result<(), Self::Error> {
		let contract = self.token_network_contract()?;
		let secret_word = web3::types::H256::from_slice(&secret.0);
		contract
			.signed_call("withdraw", (channel_identifier, secret_word, secret_hash), Options::default(), &self.key)
			.await?;
		Ok(())
	}

	async fn register_secret(&self, secret: Secret) -> Result<(), Self::Error> {
		let contract = self.secret_registry_contract()?;
		let secret_word = web3::types::H256::from_slice(&secret.0);
		contract.signed_call("registerSecret", (secret_word,), Options::default(), &self.key).await?;
		Ok(())
	}

	async fn settle_channel(
		&self,
		channel_identifier: ChannelIdentifier,
		token_address: TokenAddress,
		our_locksroot: Locksroot,
		partner_locksroot: Locksroot,
	) -> Result<(), Self::Error> {
		let contract = self.token_network_contract()?;
		contract
			.signed_call(
				"settleChannel",
				(channel_identifier, token_address, our_locksroot, partner_locksroot),
				Options::default(),
				&self.key,
			)
			.await?;
		Ok(())
	}

	async fn current_block_number(&self) -> Result<BlockNumber, Self::Error> {
		let block_number = self.web3.eth().block_number().await?;
		Ok(block_number.as_u64())
	}

	async fn contract_balance(&self, channel_identifier: ChannelIdentifier) -> Result<TokenAmount, Self::Error> {
		let contract = self.token_network_contract()?;
		let balance: TokenAmount = contract
			.query("getChannelParticipantBalance", (channel_identifier,), None, Options::default(), None)
			.await?;
		Ok(balance)
	}
}
