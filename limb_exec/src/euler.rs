//! # Euler rotation orders
//!
//! Lookup table of the twelve Euler rotation orders. For each order, the
//! optional pre and post rotations are 90 degree DH segments that must be
//! added around a wrist's own chain so that its frames line up with the
//! order's canonical axes.
//!
//! [`EulerOrder::derive`] picks the order matching a wrist's DH parameters.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::dh::{ChainError, DhParam};
use crate::wrist::SphericalWrist;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const ROLL_POST: DhParam = DhParam::new(0.0, 0.0, 0.0, 90.0);
const SWAP_POST: DhParam = DhParam::new(0.0, -90.0, 0.0, -90.0);
const X_PRE: DhParam = DhParam::new(0.0, 90.0, 0.0, 0.0);

/// Every Euler order with its compensating rotations.
pub const EULER_ORDERS: [EulerOrder; 12] = [
    EulerOrder::new(RotationOrder::ZXZ, None, None),
    EulerOrder::new(RotationOrder::ZYZ, None, None),
    EulerOrder::new(RotationOrder::ZXY, None, Some(ROLL_POST)),
    EulerOrder::new(RotationOrder::ZYX, None, Some(SWAP_POST)),
    EulerOrder::new(RotationOrder::YXY, None, Some(ROLL_POST)),
    EulerOrder::new(RotationOrder::YZY, None, Some(ROLL_POST)),
    EulerOrder::new(RotationOrder::YXZ, None, None),
    EulerOrder::new(RotationOrder::YZX, None, Some(SWAP_POST)),
    EulerOrder::new(RotationOrder::XYX, Some(X_PRE), Some(SWAP_POST)),
    EulerOrder::new(RotationOrder::XZX, Some(X_PRE), Some(SWAP_POST)),
    EulerOrder::new(RotationOrder::XYZ, Some(X_PRE), None),
    EulerOrder::new(RotationOrder::XZY, Some(X_PRE), Some(ROLL_POST)),
];

/// Wrist `(alpha1, alpha2, alpha3, theta1, theta2, theta3)` patterns for each
/// order, after Shah, Saha and Dutt.
const WRIST_PATTERNS: [([i32; 6], RotationOrder); 12] = [
    ([0, 90, -90, 90, 0, -90], RotationOrder::ZXZ),
    ([0, -90, 90, 0, 0, 0], RotationOrder::ZYZ),
    ([0, 90, -90, 90, -90, -90], RotationOrder::ZXY),
    ([0, -90, 90, 0, 90, 90], RotationOrder::ZYX),
    ([-90, 90, -90, 90, 0, -90], RotationOrder::YXY),
    ([-90, 90, -90, 0, 0, 0], RotationOrder::YZY),
    ([-90, 90, -90, 90, 90, -90], RotationOrder::YXZ),
    ([-90, 90, 90, 0, 90, 0], RotationOrder::YZX),
    ([90, -90, 90, -90, 0, 90], RotationOrder::XYX),
    ([90, -90, 90, 0, 0, 0], RotationOrder::XZX),
    ([90, -90, 90, -90, -90, 0], RotationOrder::XYZ),
    ([90, -90, -90, 0, -90, 0], RotationOrder::XZY),
];

/// Values the final alpha of a trailing wrist is retried with.
const FREE_ALPHAS: [i32; 3] = [-90, 0, 90];

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The twelve Euler rotation orders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RotationOrder {
    ZXZ,
    ZYZ,
    ZXY,
    ZYX,
    YXY,
    YZY,
    YXZ,
    YZX,
    XYX,
    XZX,
    XYZ,
    XZY,
}

/// A principal axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EulerOrder {
    pub order: RotationOrder,

    /// Rotation prepended to the wrist chain.
    pub pre_rotation: Option<DhParam>,

    /// Rotation appended to the wrist chain.
    pub post_rotation: Option<DhParam>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RotationOrder {
    /// Table entry for this order.
    pub fn euler_order(self) -> &'static EulerOrder {
        // The table is declared in enum order
        &EULER_ORDERS[self as usize]
    }

    /// The axes rotated about, in order.
    pub fn axes(self) -> [Axis; 3] {
        use Axis::*;

        match self {
            RotationOrder::ZXZ => [Z, X, Z],
            RotationOrder::ZYZ => [Z, Y, Z],
            RotationOrder::ZXY => [Z, X, Y],
            RotationOrder::ZYX => [Z, Y, X],
            RotationOrder::YXY => [Y, X, Y],
            RotationOrder::YZY => [Y, Z, Y],
            RotationOrder::YXZ => [Y, X, Z],
            RotationOrder::YZX => [Y, Z, X],
            RotationOrder::XYX => [X, Y, X],
            RotationOrder::XZX => [X, Z, X],
            RotationOrder::XYZ => [X, Y, Z],
            RotationOrder::XZY => [X, Z, Y],
        }
    }

    /// True for the proper Euler orders, whose first and last axes match.
    pub fn is_proper(self) -> bool {
        let axes = self.axes();
        axes[0] == axes[2]
    }
}

impl fmt::Display for RotationOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl EulerOrder {
    pub const fn new(
        order: RotationOrder,
        pre_rotation: Option<DhParam>,
        post_rotation: Option<DhParam>,
    ) -> Self {
        Self {
            order,
            pre_rotation,
            post_rotation,
        }
    }

    /// The wrist chain with this order's pre and post rotations added.
    pub fn compensated_chain(&self, wrist: &SphericalWrist) -> Vec<DhParam> {
        self.pre_rotation
            .iter()
            .chain(wrist.params().iter())
            .chain(self.post_rotation.iter())
            .copied()
            .collect()
    }

    /// Find the Euler order matching a wrist.
    ///
    /// Every alpha and theta of the wrist must be 0 or +/-90 degrees. When the
    /// wrist is the last element of the chain its final alpha does not affect
    /// the tip position, so the alternatives -90, 0 and 90 are tried instead,
    /// and exactly one of them must match.
    pub fn derive(wrist: &SphericalWrist, is_last: bool) -> Result<&'static EulerOrder, ChainError> {
        let params = wrist.params();

        let mut pattern = [0i32; 6];
        for (i, p) in params.iter().enumerate() {
            pattern[i] = right_angle(p.alpha).ok_or_else(|| {
                ChainError::NoEulerOrder(format!("alpha {} is {}", i + 1, p.alpha))
            })?;
            pattern[i + 3] = right_angle(p.theta).ok_or_else(|| {
                ChainError::NoEulerOrder(format!("theta {} is {}", i + 1, p.theta))
            })?;
        }

        if let Some(order) = lookup(&pattern) {
            return Ok(order.euler_order());
        }

        if !is_last {
            return Err(ChainError::NoEulerOrder(format!(
                "no order matches pattern {:?}",
                pattern
            )));
        }

        let matches: Vec<RotationOrder> = FREE_ALPHAS
            .iter()
            .filter_map(|alpha| {
                let mut alt = pattern;
                alt[2] = *alpha;
                lookup(&alt)
            })
            .collect();

        match matches.as_slice() {
            [order] => Ok(order.euler_order()),
            [] => Err(ChainError::NoEulerOrder(format!(
                "no order matches pattern {:?} with a free final alpha",
                pattern
            ))),
            _ => Err(ChainError::NoEulerOrder(format!(
                "pattern {:?} is ambiguous with a free final alpha: {:?}",
                pattern, matches
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Returns the angle as an integer if it is exactly 0 or +/-90.
fn right_angle(value: f64) -> Option<i32> {
    [0, 90, -90].iter().copied().find(|v| *v as f64 == value)
}

fn lookup(pattern: &[i32; 6]) -> Option<RotationOrder> {
    WRIST_PATTERNS
        .iter()
        .find(|(p, _)| p == pattern)
        .map(|(_, order)| *order)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn wrist(pattern: [f64; 6]) -> SphericalWrist {
        SphericalWrist::new(&[
            DhParam::new(0.0, pattern[3], 0.0, pattern[0]),
            DhParam::new(0.0, pattern[4], 0.0, pattern[1]),
            DhParam::new(0.0, pattern[5], 0.0, pattern[2]),
        ])
        .unwrap()
    }

    #[test]
    fn test_table_is_in_enum_order() {
        for (i, entry) in EULER_ORDERS.iter().enumerate() {
            assert_eq!(entry.order as usize, i);
            assert_eq!(entry.order.euler_order(), entry);
        }
    }

    #[test]
    fn test_table_entries() {
        let zyx = RotationOrder::ZYX.euler_order();
        assert_eq!(zyx.pre_rotation, None);
        assert_eq!(zyx.post_rotation, Some(DhParam::new(0.0, -90.0, 0.0, -90.0)));

        let xzy = RotationOrder::XZY.euler_order();
        assert_eq!(xzy.pre_rotation, Some(DhParam::new(0.0, 90.0, 0.0, 0.0)));
        assert_eq!(xzy.post_rotation, Some(DhParam::new(0.0, 0.0, 0.0, 90.0)));

        let zxz = RotationOrder::ZXZ.euler_order();
        assert!(zxz.pre_rotation.is_none() && zxz.post_rotation.is_none());
        assert!(RotationOrder::ZXZ.is_proper());
        assert!(!RotationOrder::XYZ.is_proper());
    }

    #[test]
    fn test_every_pattern_derives() {
        for (pattern, order) in WRIST_PATTERNS.iter() {
            let mut values = [0f64; 6];
            for (v, p) in values.iter_mut().zip(pattern.iter()) {
                *v = *p as f64;
            }

            let derived = EulerOrder::derive(&wrist(values), false).unwrap();
            assert_eq!(derived.order, *order);
        }
    }

    #[test]
    fn test_derive_rejects_odd_angles() {
        let w = wrist([0.0, 90.0, -90.0, 45.0, 0.0, -90.0]);
        assert!(matches!(
            EulerOrder::derive(&w, true),
            Err(ChainError::NoEulerOrder(_))
        ));
    }

    #[test]
    fn test_derive_free_final_alpha() {
        // ZYZ with the last alpha zeroed out only matches when trailing
        let w = wrist([0.0, -90.0, 0.0, 0.0, 0.0, 0.0]);

        assert!(EulerOrder::derive(&w, false).is_err());
        assert_eq!(
            EulerOrder::derive(&w, true).unwrap().order,
            RotationOrder::ZYZ
        );
    }

    #[test]
    fn test_compensated_chain() {
        let w = wrist([90.0, -90.0, 90.0, -90.0, -90.0, 0.0]);
        let order = EulerOrder::derive(&w, false).unwrap();
        assert_eq!(order.order, RotationOrder::XYZ);

        let chain = order.compensated_chain(&w);
        assert_eq!(chain.len(), 4);
        assert_eq!(chain[0], DhParam::new(0.0, 90.0, 0.0, 0.0));
        assert_eq!(&chain[1..], w.params());
    }
}
