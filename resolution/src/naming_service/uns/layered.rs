//! L1/L2 merge policy.
//!
//! Both layers are always queried to completion; these functions only decide
//! afterwards. They are pure so the precedence rules can be tested without a
//! transport.
//!
//! Precedence, for any lookup with a notion of a "positive" answer:
//!
//! 1. L2 succeeded with a positive answer: L2 wins.
//! 2. L1 succeeded with a positive answer: L1 wins, an L2 failure is dropped.
//! 3. Both succeeded: L1's (negative) answer is the canonical one.
//! 4. Otherwise the failure propagates, L1's first when both failed.

use crate::error::Result;
use crate::types::{Address, Layer, ResolutionRecord};

/// Merges two layer results under the precedence above and reports which
/// layer the answer came from.
pub fn merge<T>(layer1: Result<T>, layer2: Result<T>, positive: impl Fn(&T) -> bool) -> Result<(T, Layer)> {
    match (layer1, layer2) {
        (_, Ok(l2)) if positive(&l2) => Ok((l2, Layer::Layer2)),
        (Ok(l1), _) if positive(&l1) => Ok((l1, Layer::Layer1)),
        (Ok(l1), Ok(_)) => Ok((l1, Layer::Layer1)),
        (Err(e), _) | (Ok(_), Err(e)) => Err(e),
    }
}

/// Owner/resolver/records: an owned domain is a positive answer.
pub fn merge_records(layer1: Result<ResolutionRecord>, layer2: Result<ResolutionRecord>) -> Result<ResolutionRecord> {
    let (mut record, layer) = merge(layer1, layer2, ResolutionRecord::is_owned)?;
    record.source = layer;
    Ok(record)
}

/// TLD existence.
pub fn merge_exists(layer1: Result<bool>, layer2: Result<bool>) -> Result<bool> {
    merge(layer1, layer2, |exists| *exists).map(|(exists, _)| exists)
}

/// Registry address. Older L1 readers revert on unknown tokens instead of
/// answering zero; that revert only counts as "zero" once L2 has answered
/// zero too.
pub fn merge_registry_address(layer1: Result<Address>, layer2: Result<Address>) -> Result<(Address, Layer)> {
    let layer1 = match (layer1, &layer2) {
        (Err(e), Ok(l2)) if e.is_revert() && l2.is_zero() => Ok(Address::ZERO),
        (l1, _) => l1,
    };
    merge(layer1, layer2, |address| !address.is_zero())
}

/// Token URI: a non-empty string is positive.
pub fn merge_token_uri(layer1: Result<String>, layer2: Result<String>) -> Result<String> {
    merge(layer1, layer2, |uri| !uri.is_empty()).map(|(uri, _)| uri)
}

/// Anything optional: `Some` is positive.
pub fn merge_option<T>(layer1: Result<Option<T>>, layer2: Result<Option<T>>) -> Result<Option<T>> {
    merge(layer1, layer2, Option::is_some).map(|(value, _)| value)
}

/// Batch lookups merged entry by entry with [`merge_option`]. A failed
/// layer only fails the entries the other layer could not answer.
pub fn merge_each<T: Clone>(
    layer1: &Result<Vec<Option<T>>>,
    layer2: &Result<Vec<Option<T>>>,
    len: usize,
) -> Result<Vec<Option<T>>> {
    let at = |layer: &Result<Vec<Option<T>>>, i: usize| match layer {
        Ok(values) => Ok(values.get(i).cloned().flatten()),
        Err(e) => Err(e.clone()),
    };
    (0..len)
        .map(|i| merge_option(at(layer1, i), at(layer2, i)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolutionError;
    use crate::types::RecordMap;

    fn addr(last: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = last;
        Address(bytes)
    }

    fn owned(owner: u8, resolver: u8, eth: &str) -> ResolutionRecord {
        let mut records = RecordMap::new();
        records.insert("crypto.ETH.address".to_string(), eth.to_string());
        ResolutionRecord {
            owner: Some(addr(owner)),
            resolver: Some(addr(resolver)),
            records,
            source: Layer::NotApplicable,
        }
    }

    fn down() -> ResolutionError {
        ResolutionError::NamingServiceDown {
            service: "UNS L2".to_string(),
            reason: "connection refused".to_string(),
        }
    }

    fn revert() -> ResolutionError {
        ResolutionError::ServiceProviderError {
            provider: "UNS L1".to_string(),
            code: Some(3),
            message: "execution reverted".to_string(),
        }
    }

    #[test]
    fn test_layer2_owner_wins_over_layer1_owner() {
        let merged = merge_records(Ok(owned(1, 2, "0x1")), Ok(owned(3, 4, "0x3"))).unwrap();
        assert_eq!(merged.owner, Some(addr(3)));
        assert_eq!(merged.resolver, Some(addr(4)));
        assert_eq!(merged.records["crypto.ETH.address"], "0x3");
        assert_eq!(merged.source, Layer::Layer2);
    }

    #[test]
    fn test_layer1_used_when_layer2_unowned() {
        let merged =
            merge_records(Ok(owned(1, 2, "0x1")), Ok(ResolutionRecord::unowned(Layer::Layer2))).unwrap();
        assert_eq!(merged.owner, Some(addr(1)));
        assert_eq!(merged.source, Layer::Layer1);
    }

    #[test]
    fn test_both_unowned_is_layer1_unowned() {
        let merged = merge_records(
            Ok(ResolutionRecord::unowned(Layer::Layer1)),
            Ok(ResolutionRecord::unowned(Layer::Layer2)),
        )
        .unwrap();
        assert!(!merged.is_owned());
        assert_eq!(merged.source, Layer::Layer1);
    }

    #[test]
    fn test_failure_discarded_when_other_layer_is_positive() {
        let merged = merge_records(Ok(owned(1, 2, "0x1")), Err(down())).unwrap();
        assert_eq!(merged.source, Layer::Layer1);

        let merged = merge_records(Err(down()), Ok(owned(3, 4, "0x3"))).unwrap();
        assert_eq!(merged.source, Layer::Layer2);
    }

    #[test]
    fn test_failure_propagates_when_other_layer_is_negative() {
        let err = merge_records(Ok(ResolutionRecord::unowned(Layer::Layer1)), Err(down())).unwrap_err();
        assert!(matches!(err, ResolutionError::NamingServiceDown { .. }));

        let err = merge_records(Err(down()), Ok(ResolutionRecord::unowned(Layer::Layer2))).unwrap_err();
        assert!(matches!(err, ResolutionError::NamingServiceDown { .. }));
    }

    #[test]
    fn test_exists_prefers_any_positive() {
        assert!(merge_exists(Ok(false), Ok(true)).unwrap());
        assert!(merge_exists(Ok(true), Err(down())).unwrap());
        assert!(!merge_exists(Ok(false), Ok(false)).unwrap());
        assert!(merge_exists(Ok(false), Err(down())).is_err());
    }

    #[test]
    fn test_registry_revert_translated_only_after_layer2_absence() {
        let (address, _) = merge_registry_address(Err(revert()), Ok(Address::ZERO)).unwrap();
        assert!(address.is_zero());

        let (address, layer) = merge_registry_address(Err(revert()), Ok(addr(9))).unwrap();
        assert_eq!((address, layer), (addr(9), Layer::Layer2));

        // Layer2 failed, so the Layer1 revert cannot be read as absence.
        assert!(merge_registry_address(Err(revert()), Err(down())).unwrap_err().is_revert());
    }

    #[test]
    fn test_registry_layer1_positive() {
        let (address, layer) = merge_registry_address(Ok(addr(5)), Ok(Address::ZERO)).unwrap();
        assert_eq!((address, layer), (addr(5), Layer::Layer1));
    }

    #[test]
    fn test_token_uri_and_options() {
        assert_eq!(
            merge_token_uri(Ok("https://l1".to_string()), Ok(String::new())).unwrap(),
            "https://l1"
        );
        assert_eq!(merge_option(Ok(None), Ok(Some(7))).unwrap(), Some(7));
        assert_eq!(merge_option::<u8>(Ok(None), Ok(None)).unwrap(), None);
    }

    #[test]
    fn test_batch_merge_is_per_entry() {
        let l1: Result<Vec<Option<u8>>> = Ok(vec![Some(1), None, Some(3)]);
        let l2: Result<Vec<Option<u8>>> = Ok(vec![Some(9), None, None]);
        assert_eq!(merge_each(&l1, &l2, 3).unwrap(), vec![Some(9), None, Some(3)]);

        let failed: Result<Vec<Option<u8>>> = Err(down());
        let full: Result<Vec<Option<u8>>> = Ok(vec![Some(1), Some(2)]);
        assert_eq!(merge_each(&full, &failed, 2).unwrap(), vec![Some(1), Some(2)]);
        let partial: Result<Vec<Option<u8>>> = Ok(vec![Some(1), None]);
        assert!(merge_each(&partial, &failed, 2).is_err());
    }
}
