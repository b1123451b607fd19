//! Piece catalog: named shapes and colours, loaded once and sampled uniformly.

use crate::piece::{ColorId, Piece, Shape};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// One catalog entry as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceDef {
    pub shape: Shape,
    pub color: ColorId,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog is empty")]
    Empty,
    #[error("invalid catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Name → piece definition. Ordered so seeded picks are reproducible.
///
/// Only serialised directly; parsing goes through [`Catalog::from_json`] so an
/// empty mapping is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Catalog {
    pieces: BTreeMap<String, PieceDef>,
}

impl Catalog {
    pub fn new(pieces: BTreeMap<String, PieceDef>) -> Result<Self, CatalogError> {
        if pieces.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(Self { pieces })
    }

    pub fn from_json(s: &str) -> Result<Self, CatalogError> {
        let pieces: BTreeMap<String, PieceDef> = serde_json::from_str(s)?;
        Self::new(pieces)
    }

    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let s = std::fs::read_to_string(path)?;
        Self::from_json(&s)
    }

    /// The seven classic tetrominoes.
    pub fn builtin() -> Self {
        const PIECES: [(&str, &[&[bool]], &str); 7] = [
            ("I", &[&[true, true, true, true]], "#00f0f0"),
            ("J", &[&[true, false, false], &[true, true, true]], "#0000f0"),
            ("L", &[&[false, false, true], &[true, true, true]], "#f0a000"),
            ("O", &[&[true, true], &[true, true]], "#f0f000"),
            ("S", &[&[false, true, true], &[true, true, false]], "#00f000"),
            ("T", &[&[false, true, false], &[true, true, true]], "#a000f0"),
            ("Z", &[&[true, true, false], &[false, true, true]], "#f00000"),
        ];
        let pieces = PIECES
            .iter()
            .filter_map(|(name, rows, color)| {
                let shape = Shape::from_rows(*rows).ok()?;
                Some((
                    (*name).to_string(),
                    PieceDef {
                        shape,
                        color: ColorId::new(*color),
                    },
                ))
            })
            .collect();
        Self { pieces }
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pieces.keys().map(String::as_str)
    }

    /// Uniform pick; every call is independent, so repeats are possible.
    pub fn pick_random<R: Rng + ?Sized>(&self, rng: &mut R) -> Piece {
        let idx = rng.gen_range(0..self.pieces.len());
        // idx < len, and `new` guarantees len > 0
        let def = self
            .pieces
            .values()
            .nth(idx)
            .unwrap_or_else(|| unreachable!("index {idx} within catalog"));
        def.to_piece()
    }
}

impl PieceDef {
    pub fn to_piece(&self) -> Piece {
        Piece {
            shape: self.shape.clone(),
            color: self.color.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const WIRE: &str = r##"{
        "I": {"shape": [[1, 1, 1, 1]], "color": "#00f0f0"},
        "T": {"shape": [[0, 1, 0], [1, 1, 1]], "color": "#a000f0"}
    }"##;

    #[test]
    fn test_parse_wire_catalog() {
        let c = Catalog::from_json(WIRE).unwrap();
        assert_eq!(c.len(), 2);
        let t = c.pieces.get("T").unwrap();
        assert_eq!((t.shape.width(), t.shape.height()), (3, 2));
        assert_eq!(t.color.as_str(), "#a000f0");
    }

    #[test]
    fn test_empty_catalog_is_rejected() {
        assert!(matches!(Catalog::from_json("{}"), Err(CatalogError::Empty)));
    }

    #[test]
    fn test_ragged_shape_is_rejected() {
        let bad = r##"{"X": {"shape": [[1, 1], [1]], "color": "#fff"}}"##;
        assert!(matches!(Catalog::from_json(bad), Err(CatalogError::Parse(_))));
    }

    #[test]
    fn test_blank_shape_is_rejected() {
        let blank = r##"{"Z0": {"shape": [[0, 0], [0, 0]], "color": "#fff"}}"##;
        assert!(matches!(Catalog::from_json(blank), Err(CatalogError::Parse(_))));
    }

    #[test]
    fn test_builtin_has_seven_four_cell_pieces() {
        let c = Catalog::builtin();
        assert_eq!(c.names().collect::<String>(), "IJLOSTZ");
        for name in ["I", "J", "L", "O", "S", "T", "Z"] {
            assert_eq!(c.pieces.get(name).unwrap().shape.filled_cells().count(), 4);
        }
    }

    #[test]
    fn test_builtin_roundtrips_through_wire_format() {
        let json = serde_json::to_string(&Catalog::builtin()).unwrap();
        assert_eq!(Catalog::from_json(&json).unwrap(), Catalog::builtin());
    }

    #[test]
    fn test_pick_random_reaches_every_piece() {
        let c = Catalog::builtin();
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..500 {
            seen.insert(c.pick_random(&mut rng).color);
        }
        assert_eq!(seen.len(), 7);
    }

    #[test]
    fn test_pick_random_single_entry() {
        let c = Catalog::from_json(r##"{"O": {"shape": [[1,1],[1,1]], "color": "#f0f000"}}"##)
            .unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..10 {
            assert_eq!(c.pick_random(&mut rng).color.as_str(), "#f0f000");
        }
    }
}
