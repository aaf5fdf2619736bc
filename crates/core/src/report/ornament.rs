//! Decorative circles scattered behind the report table.
//!
//! Placement is best effort: each slot gets a bounded number of random
//! samples and is skipped if none of them is acceptable, so a crowded page
//! simply ends up with fewer ornaments.

use rand::Rng;

use crate::report::model::{PageLayout, TableLayout};

pub const ORNAMENT_TARGET: usize = 20;
pub const ORNAMENT_MAX_ATTEMPTS: u32 = 50;
pub const ORNAMENT_MIN_SEPARATION: f32 = 40.0;

/// Fill colours, assigned by slot index.
pub const ORNAMENT_PALETTE: [u32; 5] = [0x6480FF, 0xFF6496, 0xB4FF78, 0xA064FF, 0xFF9664];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ornament {
    pub x: f32,
    pub y: f32,
    /// Slot the ornament was placed for; picks its palette colour.
    pub slot: usize,
}

impl Ornament {
    pub fn color(&self) -> u32 {
        ORNAMENT_PALETTE[self.slot % ORNAMENT_PALETTE.len()]
    }

    fn distance_to(&self, x: f32, y: f32) -> f32 {
        ((self.x - x).powi(2) + (self.y - y).powi(2)).sqrt()
    }
}

/// Where ornaments may go. Coordinates are top-down page points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrnamentField {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
    /// Samples with `y` above this line land on the title band and are rejected.
    pub protected_until_y: f32,
    pub min_separation: f32,
    pub target: usize,
    pub max_attempts: u32,
}

impl OrnamentField {
    pub fn for_page(page: &PageLayout, table: &TableLayout) -> Self {
        Self {
            min_x: page.margin,
            max_x: page.width - page.margin,
            min_y: page.margin,
            max_y: page.height - page.margin,
            protected_until_y: table.top + 50.0,
            min_separation: ORNAMENT_MIN_SEPARATION,
            target: ORNAMENT_TARGET,
            max_attempts: ORNAMENT_MAX_ATTEMPTS,
        }
    }

    fn accepts(&self, placed: &[Ornament], x: f32, y: f32) -> bool {
        if y < self.protected_until_y {
            return false;
        }
        placed.iter().all(|o| o.distance_to(x, y) >= self.min_separation)
    }
}

pub fn place_ornaments<R: Rng + ?Sized>(field: &OrnamentField, rng: &mut R) -> Vec<Ornament> {
    let mut placed: Vec<Ornament> = Vec::with_capacity(field.target);
    if field.min_x > field.max_x || field.min_y > field.max_y {
        return placed;
    }

    for slot in 0..field.target {
        for _ in 0..field.max_attempts {
            let x = rng.gen_range(field.min_x..=field.max_x);
            let y = rng.gen_range(field.min_y..=field.max_y);
            if field.accepts(&placed, x, y) {
                placed.push(Ornament { x, y, slot });
                break;
            }
        }
    }

    if placed.len() < field.target {
        tracing::debug!(
            placed = placed.len(),
            target = field.target,
            "ornament attempts exhausted; placing fewer"
        );
    }

    placed
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn a4_field() -> OrnamentField {
        OrnamentField::for_page(&PageLayout::A4, &TableLayout::default())
    }

    #[test]
    fn placed_ornaments_keep_their_distance() {
        let field = a4_field();
        for seed in 0..200u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let placed = place_ornaments(&field, &mut rng);
            assert!(placed.len() <= ORNAMENT_TARGET);
            for (i, a) in placed.iter().enumerate() {
                assert!(a.x >= field.min_x && a.x <= field.max_x);
                assert!(a.y >= field.protected_until_y && a.y <= field.max_y);
                for b in &placed[i + 1..] {
                    assert!(
                        a.distance_to(b.x, b.y) >= field.min_separation,
                        "seed {seed}: {a:?} too close to {b:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn crowded_field_places_fewer() {
        // The diagonal of a 25x25 box is shorter than the separation.
        let field = OrnamentField {
            min_x: 0.0,
            max_x: 25.0,
            min_y: 0.0,
            max_y: 25.0,
            protected_until_y: 0.0,
            ..a4_field()
        };
        let mut rng = StdRng::seed_from_u64(7);
        let placed = place_ornaments(&field, &mut rng);
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].slot, 0);
    }

    #[test]
    fn fully_protected_field_places_none() {
        let field = OrnamentField {
            protected_until_y: 10_000.0,
            ..a4_field()
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert!(place_ornaments(&field, &mut rng).is_empty());
    }

    #[test]
    fn same_seed_same_layout() {
        let field = a4_field();
        let a = place_ornaments(&field, &mut StdRng::seed_from_u64(42));
        let b = place_ornaments(&field, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn palette_cycles_by_slot() {
        let o = Ornament { x: 0.0, y: 0.0, slot: 7 };
        assert_eq!(o.color(), ORNAMENT_PALETTE[2]);
    }
}
