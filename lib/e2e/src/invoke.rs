//! Calling deployed contracts: signed external calls and local runs.
use alloy::{
    dyn_abi::{DynSolType, DynSolValue, FunctionExt, JsonAbiExt, Specifier},
    eips::BlockId,
    json_abi::{Function, Param},
    network::TransactionBuilder,
    primitives::{Address, Bytes, U256},
    providers::Provider,
    rpc::types::{TransactionReceipt, TransactionRequest},
};
use eyre::{bail, Context, ContextCompat};
use serde_json::Value;

use crate::{
    account::Account,
    error::{rejection_from_rpc, ClientError, Outcome, Rejection},
};

/// Decoded return values of a method, keyed by output name.
///
/// Unnamed outputs are called `value0`, `value1`, ...
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecodedOutput {
    fields: Vec<(String, DynSolValue)>,
}

impl DecodedOutput {
    pub(crate) fn new(outputs: &[Param], values: Vec<DynSolValue>) -> Self {
        let fields = outputs
            .iter()
            .zip(values)
            .enumerate()
            .map(|(i, (param, value))| {
                let name = if param.name.is_empty() {
                    format!("value{i}")
                } else {
                    param.name.clone()
                };
                (name, value)
            })
            .collect();
        Self { fields }
    }

    /// Value of output `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DynSolValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Iterate over `(name, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DynSolValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of outputs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the method returned nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn field(&self, name: &str) -> eyre::Result<&DynSolValue> {
        self.get(name).wrap_err(format!("output `{name}` is missing"))
    }

    /// Output `name` as an unsigned integer.
    ///
    /// # Errors
    ///
    /// May fail if the output is missing or not an unsigned integer.
    pub fn uint(&self, name: &str) -> eyre::Result<U256> {
        self.field(name)?
            .as_uint()
            .map(|(value, _)| value)
            .wrap_err(format!("output `{name}` is not an unsigned integer"))
    }

    /// Output `name` as an address.
    ///
    /// # Errors
    ///
    /// May fail if the output is missing or not an address.
    pub fn address(&self, name: &str) -> eyre::Result<Address> {
        self.field(name)?
            .as_address()
            .wrap_err(format!("output `{name}` is not an address"))
    }

    /// Output `name` as a boolean.
    ///
    /// # Errors
    ///
    /// May fail if the output is missing or not a boolean.
    pub fn bool(&self, name: &str) -> eyre::Result<bool> {
        self.field(name)?
            .as_bool()
            .wrap_err(format!("output `{name}` is not a boolean"))
    }
}

/// Record of a mined external call.
#[derive(Clone, Debug)]
pub struct RunResult {
    /// Values returned by the method when simulated right before sending.
    pub output: DecodedOutput,
    /// Receipt of the transaction.
    pub receipt: TransactionReceipt,
}

/// Coerce named JSON arguments into ABI values ordered like `params`.
///
/// `args` must be an object (or `null` when there are no parameters).
pub(crate) fn encode_params(
    params: &[Param],
    args: &Value,
) -> Result<Vec<DynSolValue>, String> {
    let empty = serde_json::Map::new();
    let args = match args {
        Value::Object(map) => map,
        Value::Null => &empty,
        other => return Err(format!("expected an object, got `{other}`")),
    };

    if let Some(unknown) =
        args.keys().find(|key| !params.iter().any(|p| &p.name == *key))
    {
        return Err(format!("unknown parameter `{unknown}`"));
    }

    params
        .iter()
        .map(|param| {
            let value = args
                .get(&param.name)
                .ok_or_else(|| format!("missing parameter `{}`", param.name))?;
            let ty = param.resolve().map_err(|e| {
                format!("unsupported type of `{}`: {e}", param.name)
            })?;
            coerce(&ty, value).map_err(|e| {
                format!("`{}` is not a valid {}: {e}", param.name, param.ty)
            })
        })
        .collect()
}

fn coerce(ty: &DynSolType, value: &Value) -> Result<DynSolValue, String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    };
    ty.coerce_str(&text).map_err(|e| e.to_string())
}

/// Find the overload of `method` taking exactly the named `args`.
fn select_function<'a>(
    account: &'a Account,
    method: &str,
    args: &Value,
) -> Result<&'a Function, ClientError> {
    let arguments_error = |reason: String| ClientError::Arguments {
        contract: account.artifact().name.clone(),
        method: method.to_string(),
        reason,
    };

    let overloads = account
        .artifact()
        .abi
        .function(method)
        .ok_or_else(|| arguments_error("no such method".to_string()))?;
    let count = args.as_object().map_or(0, serde_json::Map::len);

    overloads
        .iter()
        .find(|f| f.inputs.len() == count)
        .or_else(|| overloads.first())
        .ok_or_else(|| arguments_error("no such method".to_string()))
}

/// External or local call of one contract method.
#[must_use = "a call does nothing until it is run"]
pub struct Call<'a> {
    account: &'a Account,
    method: String,
    args: Value,
    value: U256,
    simulate: bool,
    gas_limit: Option<u64>,
}

impl<'a> Call<'a> {
    pub(crate) fn new(account: &'a Account, method: &str, args: Value) -> Self {
        Self {
            account,
            method: method.to_string(),
            args,
            value: U256::ZERO,
            simulate: true,
            gas_limit: None,
        }
    }

    /// Attach native value to the call.
    pub fn value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// Send without simulating first.
    ///
    /// A rejected call is then mined as a failed transaction and its
    /// rejection recovered by replaying it. The outputs of a successful call
    /// are left empty.
    pub fn without_simulation(mut self) -> Self {
        self.simulate = false;
        self
    }

    /// Use `gas` as the gas limit instead of estimating it.
    pub fn gas_limit(mut self, gas: u64) -> Self {
        self.gas_limit = Some(gas);
        self
    }

    fn prepare(&self) -> Result<(&'a Function, TransactionRequest), ClientError> {
        let function = select_function(self.account, &self.method, &self.args)?;
        let values =
            encode_params(&function.inputs, &self.args).map_err(|reason| {
                ClientError::Arguments {
                    contract: self.account.artifact().name.clone(),
                    method: self.method.clone(),
                    reason,
                }
            })?;
        let input = function.abi_encode_input(&values).map_err(|e| {
            ClientError::Arguments {
                contract: self.account.artifact().name.clone(),
                method: self.method.clone(),
                reason: e.to_string(),
            }
        })?;

        let mut tx = TransactionRequest::default()
            .with_from(self.account.keypair().address())
            .with_to(self.account.address())
            .with_input(Bytes::from(input))
            .with_value(self.value);
        if let Some(gas) = self.gas_limit {
            tx = tx.with_gas_limit(gas);
        }
        Ok((function, tx))
    }

    fn decode(&self, function: &Function, data: &[u8]) -> eyre::Result<DecodedOutput> {
        let values = function.abi_decode_output(data).wrap_err(format!(
            "failed to decode output of `{}.{}`",
            self.account.artifact().name,
            self.method
        ))?;
        Ok(DecodedOutput::new(&function.outputs, values))
    }

    /// Sign and send the call, waiting until it is mined.
    ///
    /// The call is simulated first unless [`Call::without_simulation`] was
    /// used. A contract rejection found either by the simulation or by the
    /// mined transaction is returned as [`Outcome::Rejected`].
    ///
    /// # Errors
    ///
    /// May fail on invalid arguments, transport errors or failures that carry
    /// no rejection.
    pub async fn run(self) -> eyre::Result<Outcome<RunResult>> {
        let (function, tx) = self.prepare()?;
        let client = self.account.client();
        let contract = &self.account.artifact().name;
        let method = &self.method;
        client.wait_fresh().await?;
        let wallet = client.wallet(self.account.keypair())?;

        let simulated = if self.simulate {
            match wallet.call(tx.clone()).await {
                Ok(data) => Some(data),
                Err(e) => {
                    if let Some(rejection) = rejection_from_rpc(&e) {
                        tracing::info!(%contract, %method, %rejection, "call rejected");
                        return Ok(Outcome::Rejected(rejection));
                    }
                    return Err(eyre::Report::new(e).wrap_err(format!(
                        "failed to simulate `{contract}.{method}`"
                    )));
                }
            }
        } else {
            None
        };

        let pending = match wallet.send_transaction(tx.clone()).await {
            Ok(pending) => pending,
            Err(e) => {
                if let Some(rejection) = rejection_from_rpc(&e) {
                    tracing::info!(%contract, %method, %rejection, "call rejected");
                    return Ok(Outcome::Rejected(rejection));
                }
                return Err(eyre::Report::new(e)
                    .wrap_err(format!("failed to send `{contract}.{method}`")));
            }
        };
        let receipt = pending
            .get_receipt()
            .await
            .wrap_err(format!("`{contract}.{method}` was not mined"))?;
        let block = receipt.block_number.unwrap_or_default();
        client.observe_block(block);

        if !receipt.status() {
            if let Some(rejection) = replay(&wallet, tx, block).await {
                tracing::info!(%contract, %method, %rejection, block, "call rejected");
                return Ok(Outcome::Rejected(rejection));
            }
            bail!(
                "`{contract}.{method}` failed in block {block} without a rejection"
            );
        }

        tracing::info!(
            %contract,
            %method,
            tx = %receipt.transaction_hash,
            block,
            gas = receipt.gas_used,
            "call mined"
        );
        let output = match simulated {
            Some(data) => self.decode(function, &data)?,
            None => DecodedOutput::default(),
        };
        Ok(Outcome::Success(RunResult { output, receipt }))
    }

    /// Execute the method against current state without a transaction.
    ///
    /// # Errors
    ///
    /// May fail on invalid arguments, transport errors, or if the contract
    /// rejects the call.
    pub async fn run_local(self) -> eyre::Result<DecodedOutput> {
        let (function, tx) = self.prepare()?;
        let client = self.account.client();
        let contract = &self.account.artifact().name;
        let method = &self.method;
        client.wait_fresh().await?;

        let data = match client.provider()?.call(tx).await {
            Ok(data) => data,
            Err(e) => {
                if let Some(rejection) = rejection_from_rpc(&e) {
                    bail!("local run of `{contract}.{method}` rejected: {rejection}");
                }
                return Err(eyre::Report::new(e)
                    .wrap_err(format!("failed to run `{contract}.{method}` locally")));
            }
        };
        tracing::debug!(%contract, %method, "local run");
        self.decode(function, &data)
    }
}

/// Re-execute a failed transaction on the state it was mined on to recover
/// its revert data.
async fn replay(
    wallet: &impl Provider,
    tx: TransactionRequest,
    block: u64,
) -> Option<Rejection> {
    let parent = BlockId::number(block.checked_sub(1)?);
    match wallet.call(tx).block(parent).await {
        Ok(_) => None,
        Err(e) => rejection_from_rpc(&e),
    }
}
