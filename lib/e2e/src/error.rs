use std::{fmt, path::PathBuf};

use alloy::{
    primitives::Bytes,
    sol,
    sol_types::{Panic, Revert, SolError},
    transports::{http::reqwest, RpcError, TransportErrorKind},
};

sol! {
    /// Error raised by token contracts when an on-chain precondition fails.
    #[derive(Debug, PartialEq, Eq)]
    error ExitCode(uint32 code);
}

/// Typed failures produced by the harness itself.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// The node did not answer at all (refused connection, gateway timeout).
    #[error("network at {endpoint} is inaccessible")]
    NetworkInaccessible {
        /// Endpoint the client was connected to.
        endpoint: String,
        /// Transport failure reported by the provider.
        #[source]
        source: RpcError<TransportErrorKind>,
    },
    /// Compiled contract output could not be used.
    #[error("artifact `{name}` at {}: {reason}", path.display())]
    Artifact {
        /// Contract name.
        name: String,
        /// Path that was read.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },
    /// Initialization data does not match the contract's constructor.
    #[error("invalid init data for `{contract}`: {reason}")]
    InitData {
        /// Contract name.
        contract: String,
        /// What went wrong.
        reason: String,
    },
    /// Call arguments do not match the method signature.
    #[error("invalid arguments for `{contract}.{method}`: {reason}")]
    Arguments {
        /// Contract name.
        contract: String,
        /// Method name.
        method: String,
        /// What went wrong.
        reason: String,
    },
    /// Deployment finished but no code is present at the computed address.
    #[error("`{contract}` has no code at {address} after deployment")]
    NotDeployed {
        /// Contract name.
        contract: String,
        /// Computed address.
        address: alloy::primitives::Address,
    },
}

/// Why a contract rejected an external call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// The contract raised `ExitCode(code)`.
    Exit(u32),
    /// The contract panicked with the given panic code.
    Panic(u64),
    /// The contract reverted with a reason string.
    Reason(String),
}

impl Rejection {
    /// Decode a rejection from raw revert data.
    ///
    /// Returns `None` when the payload is not one of the known shapes.
    #[must_use]
    pub fn decode(data: &[u8]) -> Option<Self> {
        let selector = data.get(..4)?;
        if selector == ExitCode::SELECTOR {
            return ExitCode::abi_decode(data).ok().map(|e| Self::Exit(e.code));
        }
        if selector == Panic::SELECTOR {
            return Panic::abi_decode(data)
                .ok()
                .map(|p| Self::Panic(p.code.saturating_to()));
        }
        if selector == Revert::SELECTOR {
            return Revert::abi_decode(data).ok().map(|r| Self::Reason(r.reason));
        }
        None
    }

    /// Exit code carried by this rejection, if the contract raised one.
    #[must_use]
    pub fn exit_code(&self) -> Option<u32> {
        match self {
            Self::Exit(code) => Some(*code),
            _ => None,
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exit(code) => write!(f, "exit code {code}"),
            Self::Panic(code) => write!(f, "panic 0x{code:02x}"),
            Self::Reason(reason) => write!(f, "reverted: {reason}"),
        }
    }
}

/// Result of an external call: either success, or an expected on-chain
/// rejection.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome<T> {
    /// The transaction was executed.
    Success(T),
    /// The contract rejected the call.
    Rejected(Rejection),
}

impl<T> Outcome<T> {
    /// Whether the call succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Rejection of this call, if any.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Success(_) => None,
            Self::Rejected(rejection) => Some(rejection),
        }
    }

    /// Maps the success value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Success(value) => Outcome::Success(f(value)),
            Self::Rejected(rejection) => Outcome::Rejected(rejection),
        }
    }
}

/// Extract a rejection from an RPC error, if the node returned revert data we
/// understand.
pub(crate) fn rejection_from_rpc(
    err: &RpcError<TransportErrorKind>,
) -> Option<Rejection> {
    let data: Bytes = err.as_error_resp()?.as_revert_data()?;
    Rejection::decode(&data)
}

/// Checks whether `report` was caused by an unreachable node.
///
/// Covers refused connections as well as gateway errors answered by a proxy
/// sitting in front of a node that is down.
#[must_use]
pub fn is_network_inaccessible(report: &eyre::Report) -> bool {
    report.chain().any(|cause| {
        if let Some(ClientError::NetworkInaccessible { .. }) =
            cause.downcast_ref::<ClientError>()
        {
            return true;
        }
        if let Some(e) = cause.downcast_ref::<reqwest::Error>() {
            return e.is_connect() || e.is_timeout();
        }
        if let Some(e) = cause.downcast_ref::<RpcError<TransportErrorKind>>()
        {
            return transport_unreachable(e);
        }
        false
    })
}

pub(crate) fn transport_unreachable(err: &RpcError<TransportErrorKind>) -> bool {
    match err {
        RpcError::Transport(TransportErrorKind::HttpError(http)) => {
            matches!(http.status, 502..=504)
        }
        RpcError::Transport(TransportErrorKind::Custom(inner)) => inner
            .downcast_ref::<reqwest::Error>()
            .is_some_and(|e| e.is_connect() || e.is_timeout()),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::U256;

    use super::*;

    #[test]
    fn decodes_exit_code() {
        let data = ExitCode { code: 102 }.abi_encode();
        let rejection = Rejection::decode(&data).expect("should decode");
        assert_eq!(rejection, Rejection::Exit(102));
        assert_eq!(rejection.exit_code(), Some(102));
    }

    #[test]
    fn decodes_panic_and_reason() {
        let panic = Panic { code: U256::from(0x11) }.abi_encode();
        assert_eq!(Rejection::decode(&panic), Some(Rejection::Panic(0x11)));
        assert_eq!(Rejection::Panic(0x11).exit_code(), None);

        let revert = Revert { reason: "not owner".to_string() }.abi_encode();
        assert_eq!(
            Rejection::decode(&revert),
            Some(Rejection::Reason("not owner".to_string()))
        );
    }

    #[test]
    fn rejects_unknown_payloads() {
        assert_eq!(Rejection::decode(&[]), None);
        assert_eq!(Rejection::decode(&[0xde, 0xad]), None);
        assert_eq!(Rejection::decode(&[0xde, 0xad, 0xbe, 0xef, 0x00]), None);
    }

    #[test]
    fn maps_outcome() {
        let ok: Outcome<u32> = Outcome::Success(1);
        assert_eq!(ok.map(|v| v + 1), Outcome::Success(2));

        let rejected: Outcome<u32> = Outcome::Rejected(Rejection::Exit(103));
        assert!(!rejected.is_success());
        assert_eq!(rejected.rejection(), Some(&Rejection::Exit(103)));
    }

    #[test]
    fn classifies_inaccessible_network() {
        let report = eyre::Report::new(ClientError::NetworkInaccessible {
            endpoint: "http://localhost:8545".to_string(),
            source: TransportErrorKind::backend_gone(),
        })
        .wrap_err("deploy root");
        assert!(is_network_inaccessible(&report));

        let report = eyre::eyre!("malformed response");
        assert!(!is_network_inaccessible(&report));
    }
}
