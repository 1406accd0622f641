//! Transaction model for the mining engine
//!
//! Transactions are built by chaining mutating calls: `coinbase_at` marks a
//! reward transaction, `spend` references a prior output, `to` appends an
//! output paying a recipient identity, `colored` tags the most recently
//! appended output with an opaque 32-bit marker, and `sign` attaches one
//! signature covering all inputs. Outputs carry no explicit amount; value
//! is encoded entirely by the spend relationship.

use crate::core::encoding::{CodecError, Reader, MAX_TX_PUTS};
use crate::crypto::{double_sha256, Hash256, KeyError, KeyPair, PUBLIC_KEY_LEN, SIGNATURE_LEN};

/// Sequence value for ordinary (non-coinbase) inputs
pub const SEQUENCE_FINAL: u32 = 0xFFFF_FFFF;

/// Transaction input: a reference to a prior output
///
/// A coinbase's sole input references no prior output: its txid is all
/// zeroes, `prev_vout` carries the block height and `sequence` carries
/// caller-chosen extra data (so sibling coinbases hash differently).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    /// Identity of the transaction whose output is being spent
    pub prev_txid: Hash256,
    /// Index of the output in that transaction
    pub prev_vout: u32,
    /// Sequence word; extra-data slot for coinbase inputs
    pub sequence: u32,
}

impl TxInput {
    /// Whether this input is the coinbase height/extra-data marker
    pub fn is_coinbase_marker(&self) -> bool {
        self.prev_txid == [0u8; 32]
    }
}

/// Transaction output: a recipient identity plus an optional color tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    /// Compressed public key of the recipient
    pub recipient: [u8; PUBLIC_KEY_LEN],
    /// Opaque 32-bit marker, uninterpreted by consensus rules
    pub color: Option<u32>,
}

/// One signature covering all inputs of a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxSignature {
    /// Compressed public key of the signer
    pub public_key: [u8; PUBLIC_KEY_LEN],
    /// Compact ECDSA signature over the unsigned-form digest
    pub signature: [u8; SIGNATURE_LEN],
}

/// A transaction: ordered inputs, ordered outputs, optional signature
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transaction {
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub signature: Option<TxSignature>,
}

impl Transaction {
    /// Create an empty transaction to build on
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn this into a coinbase: a single marker input carrying the block
    /// height and an extra-data word instead of a prior output reference
    pub fn coinbase_at(mut self, height: u32, extra: u32) -> Self {
        self.inputs.push(TxInput {
            prev_txid: [0u8; 32],
            prev_vout: height,
            sequence: extra,
        });
        self
    }

    /// Add an input spending output `vout` of `prev`
    pub fn spend(mut self, prev: &Transaction, vout: u32) -> Self {
        self.inputs.push(TxInput {
            prev_txid: prev.id(),
            prev_vout: vout,
            sequence: SEQUENCE_FINAL,
        });
        self
    }

    /// Append an output paying the given recipient identity
    pub fn to(mut self, recipient: [u8; PUBLIC_KEY_LEN]) -> Self {
        self.outputs.push(TxOutput {
            recipient,
            color: None,
        });
        self
    }

    /// Tag the most recently appended output with an opaque color marker
    pub fn colored(mut self, tag: u32) -> Self {
        if let Some(output) = self.outputs.last_mut() {
            output.color = Some(tag);
        }
        self
    }

    /// Sign the transaction; the signature covers all inputs.
    ///
    /// Signing changes the transaction identity, so spend references must
    /// name the signed form.
    pub fn sign(mut self, key_pair: &KeyPair) -> Result<Self, KeyError> {
        let digest = self.signing_digest();
        let signature = key_pair.sign(&digest)?;
        self.signature = Some(TxSignature {
            public_key: key_pair.public_key_bytes(),
            signature,
        });
        Ok(self)
    }

    /// Digest signed by `sign`: the transaction encoded in unsigned form
    pub fn signing_digest(&self) -> Hash256 {
        let mut bytes = Vec::new();
        self.encode_body(&mut bytes);
        bytes.push(0); // unsigned marker
        double_sha256(&bytes)
    }

    /// Verify the attached signature over all inputs.
    ///
    /// Coinbase transactions carry no signature and verify trivially; an
    /// unsigned non-coinbase transaction does not verify.
    pub fn verify_signature(&self) -> bool {
        if self.is_coinbase() {
            return true;
        }
        let sig = match &self.signature {
            Some(sig) => sig,
            None => return false,
        };
        let public_key = match crate::crypto::public_key_from_bytes(&sig.public_key) {
            Ok(key) => key,
            Err(_) => return false,
        };
        crate::crypto::verify_signature(&public_key, &self.signing_digest(), &sig.signature)
    }

    /// Whether this transaction is signed
    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// Whether this is a coinbase (single height/extra marker input)
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].is_coinbase_marker()
    }

    /// Transaction identity: double SHA-256 of the canonical encoding
    pub fn id(&self) -> Hash256 {
        double_sha256(&self.encode())
    }

    /// Transaction identity as lowercase hex
    pub fn id_hex(&self) -> String {
        hex::encode(self.id())
    }

    // =========================================================================
    // Canonical codec
    // =========================================================================

    fn encode_body(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.inputs.len() as u32).to_le_bytes());
        for input in &self.inputs {
            out.extend_from_slice(&input.prev_txid);
            out.extend_from_slice(&input.prev_vout.to_le_bytes());
            out.extend_from_slice(&input.sequence.to_le_bytes());
        }

        out.extend_from_slice(&(self.outputs.len() as u32).to_le_bytes());
        for output in &self.outputs {
            out.extend_from_slice(&output.recipient);
            match output.color {
                Some(tag) => {
                    out.push(1);
                    out.extend_from_slice(&tag.to_le_bytes());
                }
                None => out.push(0),
            }
        }
    }

    /// Encode into a caller-owned buffer
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        self.encode_body(out);
        match &self.signature {
            Some(sig) => {
                out.push(1);
                out.extend_from_slice(&sig.public_key);
                out.extend_from_slice(&sig.signature);
            }
            None => out.push(0),
        }
    }

    /// Canonical byte encoding
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64 + 40 * self.inputs.len() + 38 * self.outputs.len());
        self.encode_into(&mut out);
        out
    }

    /// Decode one transaction from a reader, leaving any following bytes
    pub fn decode_from(reader: &mut Reader) -> Result<Self, CodecError> {
        let input_count = reader.read_count(MAX_TX_PUTS)?;
        let mut inputs = Vec::with_capacity(input_count);
        for _ in 0..input_count {
            inputs.push(TxInput {
                prev_txid: reader.read_hash()?,
                prev_vout: reader.read_u32()?,
                sequence: reader.read_u32()?,
            });
        }

        let output_count = reader.read_count(MAX_TX_PUTS)?;
        if output_count == 0 {
            return Err(CodecError::EmptyOutputs);
        }
        let mut outputs = Vec::with_capacity(output_count);
        for _ in 0..output_count {
            let recipient = reader.read_pubkey()?;
            let color = if reader.read_flag()? {
                Some(reader.read_u32()?)
            } else {
                None
            };
            outputs.push(TxOutput { recipient, color });
        }

        let signature = if reader.read_flag()? {
            Some(TxSignature {
                public_key: reader.read_pubkey()?,
                signature: reader.read_signature()?,
            })
        } else {
            None
        };

        Ok(Self {
            inputs,
            outputs,
            signature,
        })
    }

    /// Decode from a byte slice; the slice must contain exactly one
    /// transaction
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut reader = Reader::new(bytes);
        let tx = Self::decode_from(&mut reader)?;
        reader.finish()?;
        Ok(tx)
    }

    /// Canonical lowercase hex encoding
    pub fn to_hex(&self) -> String {
        hex::encode(self.encode())
    }

    /// Decode from the canonical hex form
    pub fn from_hex(s: &str) -> Result<Self, CodecError> {
        Self::decode(&hex::decode(s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipient(byte: u8) -> [u8; PUBLIC_KEY_LEN] {
        let mut r = [byte; PUBLIC_KEY_LEN];
        r[0] = 0x03;
        r
    }

    #[test]
    fn test_coinbase_shape() {
        let tx = Transaction::new().coinbase_at(7, 1).to(recipient(0xaa));
        assert!(tx.is_coinbase());
        assert_eq!(tx.inputs[0].prev_vout, 7);
        assert_eq!(tx.inputs[0].sequence, 1);
        assert!(tx.verify_signature()); // coinbase needs no signature
    }

    #[test]
    fn test_coinbase_extra_data_changes_identity() {
        let a = Transaction::new().coinbase_at(0, 1).to(recipient(0xaa));
        let b = Transaction::new().coinbase_at(0, 2).to(recipient(0xaa));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_color_applies_to_last_output() {
        let tx = Transaction::new()
            .to(recipient(0x11))
            .to(recipient(0x22))
            .colored(0xff0000ff);
        assert_eq!(tx.outputs[0].color, None);
        assert_eq!(tx.outputs[1].color, Some(0xff0000ff));
    }

    #[test]
    fn test_sign_and_verify() {
        let key = KeyPair::generate();
        let coinbase = Transaction::new().coinbase_at(1, 0).to(key.public_key_bytes());

        let tx = Transaction::new()
            .spend(&coinbase, 0)
            .to(recipient(0xbb))
            .sign(&key)
            .unwrap();

        assert!(tx.is_signed());
        assert!(tx.verify_signature());
    }

    #[test]
    fn test_unsigned_does_not_verify() {
        let key = KeyPair::generate();
        let coinbase = Transaction::new().coinbase_at(1, 0).to(key.public_key_bytes());
        let tx = Transaction::new().spend(&coinbase, 0).to(recipient(0xbb));
        assert!(!tx.verify_signature());
    }

    #[test]
    fn test_tampered_signature_fails() {
        let key = KeyPair::generate();
        let coinbase = Transaction::new().coinbase_at(1, 0).to(key.public_key_bytes());
        let mut tx = Transaction::new()
            .spend(&coinbase, 0)
            .to(recipient(0xbb))
            .sign(&key)
            .unwrap();

        // Changing an output invalidates the signature
        tx.outputs[0].recipient = recipient(0xcc);
        assert!(!tx.verify_signature());
    }

    #[test]
    fn test_codec_roundtrip() {
        let key = KeyPair::generate();
        let coinbase = Transaction::new()
            .coinbase_at(3, 9)
            .to(key.public_key_bytes())
            .colored(0x13371337);
        let spend = Transaction::new()
            .spend(&coinbase, 0)
            .to(recipient(0xdd))
            .colored(0x00ff00ff)
            .sign(&key)
            .unwrap();

        for tx in [coinbase, spend] {
            let bytes = tx.encode();
            let decoded = Transaction::decode(&bytes).unwrap();
            assert_eq!(decoded, tx);
            assert_eq!(decoded.encode(), bytes);

            let rehydrated = Transaction::from_hex(&tx.to_hex()).unwrap();
            assert_eq!(rehydrated, tx);
        }
    }

    #[test]
    fn test_decode_rejects_zero_outputs() {
        let mut tx = Transaction::new().coinbase_at(0, 0).to(recipient(0xaa));
        tx.outputs.clear();
        let err = Transaction::decode(&tx.encode()).unwrap_err();
        assert!(matches!(err, CodecError::EmptyOutputs));
    }

    #[test]
    fn test_decode_rejects_truncation() {
        let tx = Transaction::new().coinbase_at(0, 0).to(recipient(0xaa));
        let bytes = tx.encode();
        let err = Transaction::decode(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, CodecError::Truncated { .. }));
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let tx = Transaction::new().coinbase_at(0, 0).to(recipient(0xaa));
        let mut bytes = tx.encode();
        bytes.push(0x00);
        let err = Transaction::decode(&bytes).unwrap_err();
        assert!(matches!(err, CodecError::TrailingBytes(1)));
    }

    #[test]
    fn test_decode_rejects_bad_marker() {
        let tx = Transaction::new().coinbase_at(0, 0).to(recipient(0xaa));
        let mut bytes = tx.encode();
        let last = bytes.len() - 1;
        bytes[last] = 0x07; // signature flag must be 0 or 1
        let err = Transaction::decode(&bytes).unwrap_err();
        assert!(matches!(err, CodecError::InvalidMarker(0x07)));
    }

    #[test]
    fn test_signing_changes_identity() {
        let key = KeyPair::generate();
        let coinbase = Transaction::new().coinbase_at(1, 0).to(key.public_key_bytes());
        let unsigned = Transaction::new().spend(&coinbase, 0).to(recipient(0xbb));
        let signed = unsigned.clone().sign(&key).unwrap();
        assert_ne!(unsigned.id(), signed.id());
    }
}
