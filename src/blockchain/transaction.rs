use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

/// Reference to an output of an earlier transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct InputRef {
    /// Id of the transaction holding the referenced output
    pub transaction_id: String,

    /// Position of the output inside that transaction
    pub output_index: u32,
}

/// A value assigned to a recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OutputRef {
    /// Recipient's address (a candidate wallet for ballots)
    pub recipient: String,

    /// Amount assigned to the recipient
    pub amount: u64,
}

impl InputRef {
    pub fn new(transaction_id: impl Into<String>, output_index: u32) -> Self {
        InputRef {
            transaction_id: transaction_id.into(),
            output_index,
        }
    }
}

impl OutputRef {
    pub fn new(recipient: impl Into<String>, amount: u64) -> Self {
        OutputRef {
            recipient: recipient.into(),
            amount,
        }
    }
}

/// Represents a transaction in the ledger
///
/// Fields are private so a transaction cannot change once it has been
/// handed to a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    /// Spent outputs; `None` marks a coinbase transaction
    #[serde(default)]
    inputs: Option<Vec<InputRef>>,

    /// Created outputs
    outputs: Vec<OutputRef>,
}

impl Transaction {
    /// Creates a transaction spending `inputs`
    ///
    /// # Arguments
    ///
    /// * `inputs` - The outputs being spent
    /// * `outputs` - The outputs being created
    ///
    /// # Returns
    ///
    /// A new Transaction instance
    pub fn new(inputs: Vec<InputRef>, outputs: Vec<OutputRef>) -> Self {
        Transaction {
            inputs: Some(inputs),
            outputs,
        }
    }

    /// Creates a coinbase transaction, which has no inputs at all
    pub fn coinbase(outputs: Vec<OutputRef>) -> Self {
        Transaction {
            inputs: None,
            outputs,
        }
    }

    pub fn inputs(&self) -> Option<&[InputRef]> {
        self.inputs.as_deref()
    }

    pub fn outputs(&self) -> &[OutputRef] {
        &self.outputs
    }

    /// True when the input list is present and non-empty
    pub fn has_inputs(&self) -> bool {
        self.inputs.as_ref().is_some_and(|inputs| !inputs.is_empty())
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.is_none()
    }

    /// Hex encoded SHA-256 of the canonical encoding
    pub fn id(&self) -> String {
        let mut hasher = Sha256::new();
        self.hash_into(&mut hasher);
        hex::encode(hasher.finalize())
    }

    /// Feeds the canonical encoding into `hasher`.
    ///
    /// Every variable-length field is length prefixed and every integer is
    /// big-endian, so distinct transactions never share an encoding.
    pub(crate) fn hash_into(&self, hasher: &mut Sha256) {
        match &self.inputs {
            None => hasher.update([0u8]),
            Some(inputs) => {
                hasher.update([1u8]);
                hasher.update((inputs.len() as u64).to_be_bytes());
                for input in inputs {
                    update_str(hasher, &input.transaction_id);
                    hasher.update(input.output_index.to_be_bytes());
                }
            }
        }

        hasher.update((self.outputs.len() as u64).to_be_bytes());
        for output in &self.outputs {
            update_str(hasher, &output.recipient);
            hasher.update(output.amount.to_be_bytes());
        }
    }
}

fn update_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_be_bytes());
    hasher.update(value.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote(voter_tx: &str, candidate: &str) -> Transaction {
        Transaction::new(
            vec![InputRef::new(voter_tx, 0)],
            vec![OutputRef::new(candidate, 1)],
        )
    }

    #[test]
    fn test_new_transaction() {
        let transaction = vote("abc", "candidate-1");

        assert!(transaction.has_inputs());
        assert!(!transaction.is_coinbase());
        assert_eq!(transaction.inputs().unwrap()[0].transaction_id, "abc");
        assert_eq!(transaction.outputs()[0].recipient, "candidate-1");
        assert_eq!(transaction.outputs()[0].amount, 1);
    }

    #[test]
    fn test_coinbase_transaction() {
        let transaction = Transaction::coinbase(vec![OutputRef::new("voter", 1)]);

        assert!(transaction.is_coinbase());
        assert!(!transaction.has_inputs());
        assert!(transaction.inputs().is_none());
    }

    #[test]
    fn test_empty_inputs_are_not_inputs() {
        let transaction = Transaction::new(vec![], vec![OutputRef::new("voter", 1)]);

        assert!(!transaction.has_inputs());
        assert!(!transaction.is_coinbase());
    }

    #[test]
    fn test_id_is_stable_and_distinguishes_content() {
        let a = vote("abc", "candidate-1");
        let b = vote("abc", "candidate-2");

        assert_eq!(a.id(), a.clone().id());
        assert_eq!(a.id().len(), 64);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_id_distinguishes_absent_and_empty_inputs() {
        let outputs = vec![OutputRef::new("voter", 1)];
        let coinbase = Transaction::coinbase(outputs.clone());
        let empty = Transaction::new(vec![], outputs);

        assert_ne!(coinbase.id(), empty.id());
    }

    #[test]
    fn test_id_is_not_ambiguous_across_field_boundaries() {
        let a = Transaction::coinbase(vec![OutputRef::new("ab", 1), OutputRef::new("c", 1)]);
        let b = Transaction::coinbase(vec![OutputRef::new("a", 1), OutputRef::new("bc", 1)]);

        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_json_shape() {
        let coinbase = Transaction::coinbase(vec![OutputRef::new("voter", 1)]);
        let json = serde_json::to_value(&coinbase).unwrap();
        assert!(json["inputs"].is_null());
        assert_eq!(json["outputs"][0]["recipient"], "voter");

        let parsed: Transaction =
            serde_json::from_str(r#"{"outputs":[{"recipient":"voter","amount":1}]}"#).unwrap();
        assert_eq!(parsed, coinbase);
    }
}
