//! # Chain classification
//!
//! Groups a flat list of DH parameters into chain elements. Two routes are
//! available:
//!
//! - [`classify`] takes a partition chosen by the caller and only checks it
//!   is well formed.
//! - [`identify_chain`] scans the chain with a [`WristIdentifier`] and
//!   greedily groups recognised wrists.
//!
//! [`to_dh_param_list`] flattens either result back into the original list.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;

use super::DhParam;
use crate::wrist::SphericalWrist;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of DH parameters in a spherical wrist.
pub const WRIST_LEN: usize = 3;

/// Alpha patterns recognised as a spherical wrist by the
/// [`DefaultWristIdentifier`].
const WRIST_ALPHA_PATTERNS: [[Option<f64>; 3]; 4] = [
    [Some(-90.0), Some(90.0), None],
    [Some(90.0), Some(-90.0), None],
    [Some(0.0), Some(90.0), Some(-90.0)],
    [Some(0.0), Some(-90.0), Some(90.0)],
];

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors relating to the shape of a DH chain.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ChainError {
    #[error("A spherical wrist needs exactly 3 DH parameters, found {0}")]
    InvalidChainShape(usize),

    #[error("The chain partition covers {partitioned} parameters but the chain has {len}")]
    PartitionLength { partitioned: usize, len: usize },

    #[error("Not a spherical wrist: {0}")]
    NotAWrist(String),

    #[error("Cannot derive an Euler order for the wrist: {0}")]
    NoEulerOrder(String),
}

/// One element of a classified chain.
#[derive(Clone, Debug, PartialEq)]
pub enum DhChainElement {
    RevoluteJoint(DhParam),
    SphericalWrist(SphericalWrist),
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Decides whether a run of DH parameters forms a spherical wrist.
pub trait WristIdentifier {
    /// Returns `Ok(())` if `chain` is a spherical wrist, otherwise an error
    /// describing why not.
    fn is_spherical_wrist(&self, chain: &[DhParam]) -> Result<(), ChainError>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Recognises the common wrist alpha patterns with a zero-offset centre link.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultWristIdentifier;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DhChainElement {
    /// The DH parameters making up this element, in chain order.
    pub fn params(&self) -> &[DhParam] {
        match self {
            DhChainElement::RevoluteJoint(p) => std::slice::from_ref(p),
            DhChainElement::SphericalWrist(w) => w.params(),
        }
    }
}

impl WristIdentifier for DefaultWristIdentifier {
    fn is_spherical_wrist(&self, chain: &[DhParam]) -> Result<(), ChainError> {
        if chain.len() != WRIST_LEN {
            return Err(ChainError::InvalidChainShape(chain.len()));
        }

        let alpha_matches = WRIST_ALPHA_PATTERNS.iter().any(|pattern| {
            pattern
                .iter()
                .zip(chain.iter())
                .all(|(expected, p)| expected.map_or(true, |a| p.alpha == a))
        });

        if !alpha_matches {
            return Err(ChainError::NotAWrist(format!(
                "alphas ({}, {}, {}) do not match a wrist configuration",
                chain[0].alpha, chain[1].alpha, chain[2].alpha
            )));
        }

        if chain[1].r != 0.0 || chain[1].d != 0.0 {
            return Err(ChainError::NotAWrist(format!(
                "centre link must have no offset, found r = {}, d = {}",
                chain[1].r, chain[1].d
            )));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Classify a chain according to a caller supplied partition.
///
/// `partition` lists the size of each element in order: 1 for a revolute
/// joint, 3 for a spherical wrist. Any other size is an invalid wrist.
pub fn classify(
    params: &[DhParam],
    partition: &[usize],
) -> Result<Vec<DhChainElement>, ChainError> {
    let partitioned: usize = partition.iter().sum();
    if partitioned != params.len() {
        return Err(ChainError::PartitionLength {
            partitioned,
            len: params.len(),
        });
    }

    let mut elements = Vec::with_capacity(partition.len());
    let mut start = 0;

    for &size in partition {
        let group = &params[start..start + size];
        start += size;

        elements.push(match size {
            1 => DhChainElement::RevoluteJoint(group[0]),
            _ => DhChainElement::SphericalWrist(SphericalWrist::new(group)?),
        });
    }

    Ok(elements)
}

/// Greedily identify spherical wrists in a chain.
///
/// The chain is scanned in strides of three. Every window accepted by
/// `identifier` becomes a wrist, every other parameter in the window becomes
/// a revolute joint. Any trailing parameters that do not fill a window, and
/// every parameter of a chain shorter than three, are revolute joints.
pub fn identify_chain(
    params: &[DhParam],
    identifier: &dyn WristIdentifier,
) -> Vec<DhChainElement> {
    let mut elements = Vec::with_capacity(params.len());

    for window in params.chunks(WRIST_LEN) {
        let wrist = match identifier.is_spherical_wrist(window) {
            Ok(()) => SphericalWrist::new(window).ok(),
            Err(e) => {
                trace!("Window is not a wrist: {}", e);
                None
            }
        };

        match wrist {
            Some(w) => elements.push(DhChainElement::SphericalWrist(w)),
            None => elements.extend(window.iter().map(|p| DhChainElement::RevoluteJoint(*p))),
        }
    }

    elements
}

/// Flatten chain elements back into a list of DH parameters.
pub fn to_dh_param_list(elements: &[DhChainElement]) -> Vec<DhParam> {
    elements
        .iter()
        .flat_map(|e| e.params().iter().copied())
        .collect()
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn chain(n: usize) -> Vec<DhParam> {
        (0..n)
            .map(|i| DhParam::new(i as f64, 10.0 * i as f64, 2.0 * i as f64, -90.0))
            .collect()
    }

    /// All partitions of `n` into parts of size 1 and 3.
    fn partitions(n: usize) -> Vec<Vec<usize>> {
        if n == 0 {
            return vec![vec![]];
        }

        let mut out = Vec::new();
        for size in &[1usize, 3] {
            if *size <= n {
                for mut rest in partitions(n - size) {
                    rest.insert(0, *size);
                    out.push(rest);
                }
            }
        }
        out
    }

    #[test]
    fn test_classify_round_trip() {
        for n in 0..8 {
            let params = chain(n);

            for partition in partitions(n) {
                let elements = classify(&params, &partition).unwrap();
                assert_eq!(elements.len(), partition.len());
                assert_eq!(to_dh_param_list(&elements), params, "{:?}", partition);
            }
        }
    }

    #[test]
    fn test_classify_rejects_bad_wrist() {
        let params = chain(4);

        assert_eq!(
            classify(&params, &[2, 2]),
            Err(ChainError::InvalidChainShape(2))
        );
        assert_eq!(classify(&params, &[4]), Err(ChainError::InvalidChainShape(4)));
        assert_eq!(
            classify(&params, &[1, 1]),
            Err(ChainError::PartitionLength {
                partitioned: 2,
                len: 4
            })
        );
    }

    #[test]
    fn test_default_identifier() {
        let id = DefaultWristIdentifier;

        let wrist = [
            DhParam::new(10.0, 0.0, 0.0, -90.0),
            DhParam::new(0.0, 0.0, 0.0, 90.0),
            DhParam::new(5.0, 0.0, 0.0, 0.0),
        ];
        assert!(id.is_spherical_wrist(&wrist).is_ok());

        let wrist = [
            DhParam::new(0.0, 0.0, 0.0, 0.0),
            DhParam::new(0.0, 0.0, 0.0, -90.0),
            DhParam::new(5.0, 0.0, 0.0, 90.0),
        ];
        assert!(id.is_spherical_wrist(&wrist).is_ok());

        // Centre link offset
        let offset = [
            DhParam::new(0.0, 0.0, 0.0, -90.0),
            DhParam::new(0.0, 0.0, 3.0, 90.0),
            DhParam::new(0.0, 0.0, 0.0, 0.0),
        ];
        assert!(matches!(
            id.is_spherical_wrist(&offset),
            Err(ChainError::NotAWrist(_))
        ));

        // Wrong alphas
        let planar = [DhParam::ZERO; 3];
        assert!(id.is_spherical_wrist(&planar).is_err());

        assert_eq!(
            id.is_spherical_wrist(&planar[..2]),
            Err(ChainError::InvalidChainShape(2))
        );
    }

    #[test]
    fn test_identify_chain() {
        let arm = [
            DhParam::new(135.0, 0.0, 0.0, -90.0),
            DhParam::new(0.0, 0.0, 175.0, 0.0),
            DhParam::new(0.0, 90.0, 169.28, 0.0),
        ];
        let wrist = [
            DhParam::new(0.0, 0.0, 0.0, -90.0),
            DhParam::new(0.0, 0.0, 0.0, 90.0),
            DhParam::new(20.0, 0.0, 0.0, 0.0),
        ];

        let mut params = arm.to_vec();
        params.extend_from_slice(&wrist);

        let elements = identify_chain(&params, &DefaultWristIdentifier);

        assert_eq!(elements.len(), 4);
        assert!(elements[..3]
            .iter()
            .all(|e| matches!(e, DhChainElement::RevoluteJoint(_))));
        assert!(matches!(elements[3], DhChainElement::SphericalWrist(_)));
        assert_eq!(to_dh_param_list(&elements), params);

        // Short chains are all revolute
        let short = identify_chain(&wrist[..2], &DefaultWristIdentifier);
        assert_eq!(short.len(), 2);
        assert!(short
            .iter()
            .all(|e| matches!(e, DhChainElement::RevoluteJoint(_))));
    }
}
