//! ABI encoding for the handful of calls the orchestrator constructs:
//! constructor arguments, one-time initializer calldata, and the ownership
//! calls. The orchestrator never parses full ABIs; the argument shapes it
//! needs are closed over [`CallArg`].

use alloy_core::primitives::{Address, Bytes, U256, keccak256};
use serde::{Deserialize, Serialize};

/// A typed call argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallArg {
    Address(Address),
    Uint(U256),
    Bool(bool),
    Bytes(Bytes),
}

impl CallArg {
    /// Canonical Solidity type name, as used in function signatures.
    fn type_name(&self) -> &'static str {
        match self {
            CallArg::Address(_) => "address",
            CallArg::Uint(_) => "uint256",
            CallArg::Bool(_) => "bool",
            CallArg::Bytes(_) => "bytes",
        }
    }
}

/// 4-byte function selector for a canonical signature like
/// `transferOwnership(address)`.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// ABI-encode an argument list: 32-byte head words, with dynamic `bytes`
/// placed in the tail behind an offset word.
pub fn encode_args(args: &[CallArg]) -> Vec<u8> {
    let head_len = 32 * args.len();
    let mut head = Vec::with_capacity(head_len);
    let mut tail: Vec<u8> = Vec::new();

    for arg in args {
        match arg {
            CallArg::Address(address) => {
                head.extend_from_slice(&[0u8; 12]);
                head.extend_from_slice(address.as_slice());
            }
            CallArg::Uint(value) => head.extend_from_slice(&value.to_be_bytes::<32>()),
            CallArg::Bool(value) => {
                let mut word = [0u8; 32];
                word[31] = *value as u8;
                head.extend_from_slice(&word);
            }
            CallArg::Bytes(bytes) => {
                let offset = head_len + tail.len();
                head.extend_from_slice(&U256::from(offset as u64).to_be_bytes::<32>());
                tail.extend_from_slice(&U256::from(bytes.len() as u64).to_be_bytes::<32>());
                tail.extend_from_slice(bytes);
                let pad = (32 - bytes.len() % 32) % 32;
                tail.extend(std::iter::repeat_n(0u8, pad));
            }
        }
    }

    head.extend_from_slice(&tail);
    head
}

/// Calldata for a method call: selector over the canonical signature derived
/// from the argument types, followed by the encoded arguments.
pub fn method_call(method: &str, args: &[CallArg]) -> Vec<u8> {
    let types: Vec<&str> = args.iter().map(CallArg::type_name).collect();
    let signature = format!("{}({})", method, types.join(","));
    let mut data = selector(&signature).to_vec();
    data.extend_from_slice(&encode_args(args));
    data
}

/// Deployment transaction data: creation bytecode followed by the encoded
/// constructor arguments.
pub fn deployment_data(bytecode: &[u8], args: &[CallArg]) -> Vec<u8> {
    let mut data = bytecode.to_vec();
    data.extend_from_slice(&encode_args(args));
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_selectors() {
        assert_eq!(hex::encode(selector("transferOwnership(address)")), "f2fde38b");
        assert_eq!(hex::encode(selector("owner()")), "8da5cb5b");
        assert_eq!(hex::encode(selector("initialize(address,address)")), "485cc955");
    }

    #[test]
    fn test_method_call_derives_signature_from_args() {
        let to = Address::repeat_byte(0x42);
        let data = method_call("transferOwnership", &[CallArg::Address(to)]);

        // Selector + one 32-byte word.
        assert_eq!(data.len(), 4 + 32);
        assert_eq!(hex::encode(&data[..4]), "f2fde38b");
        assert_eq!(data[4..16], [0u8; 12]);
        assert_eq!(&data[16..36], to.as_slice());
    }

    #[test]
    fn test_encode_static_args() {
        let encoded = encode_args(&[
            CallArg::Uint(U256::from(1_000_000_000_000_000_000u64)),
            CallArg::Bool(true),
        ]);

        assert_eq!(encoded.len(), 64);
        assert_eq!(
            hex::encode(&encoded[..32]),
            "0000000000000000000000000000000000000000000000000de0b6b3a7640000"
        );
        assert_eq!(encoded[63], 1);
    }

    #[test]
    fn test_encode_dynamic_bytes_offset_and_padding() {
        let implementation = Address::repeat_byte(0x11);
        let owner = Address::repeat_byte(0x22);
        let init = Bytes::from(vec![0xAA; 36]);
        let encoded = encode_args(&[
            CallArg::Address(implementation),
            CallArg::Address(owner),
            CallArg::Bytes(init),
        ]);

        // Head: 3 words. The bytes offset points just past the head: 0x60.
        assert_eq!(
            hex::encode(&encoded[64..96]),
            "0000000000000000000000000000000000000000000000000000000000000060"
        );
        // Tail: length word (36 = 0x24), then data padded to 64 bytes.
        assert_eq!(
            hex::encode(&encoded[96..128]),
            "0000000000000000000000000000000000000000000000000000000000000024"
        );
        assert_eq!(encoded.len(), 96 + 32 + 64);
        assert_eq!(&encoded[128..164], &[0xAA; 36]);
        assert_eq!(&encoded[164..192], &[0u8; 28]);
    }

    #[test]
    fn test_empty_bytes_encodes_length_zero() {
        let encoded = encode_args(&[CallArg::Bytes(Bytes::default())]);

        // Offset word (0x20) + zero length word, no tail data.
        assert_eq!(encoded.len(), 64);
        assert_eq!(
            hex::encode(&encoded[..32]),
            "0000000000000000000000000000000000000000000000000000000000000020"
        );
        assert_eq!(encoded[32..64], [0u8; 32]);
    }

    #[test]
    fn test_deployment_data_appends_constructor_args() {
        let bytecode = vec![0x60, 0x80, 0x60, 0x40];
        let data = deployment_data(&bytecode, &[CallArg::Address(Address::repeat_byte(0x0A))]);

        assert_eq!(&data[..4], &bytecode[..]);
        assert_eq!(data.len(), 4 + 32);
        assert_eq!(&data[16..36], Address::repeat_byte(0x0A).as_slice());
    }
}
