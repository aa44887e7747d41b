use proptest::prelude::*;
use tova::{Biome, SEA_LEVEL, TerrainField, WorldConfig, Zone};

fn field(seed: u32) -> TerrainField {
    TerrainField::from_world_config(&WorldConfig::with_seed(seed))
}

fn coord() -> impl Strategy<Value = f64> {
    -20_000.0f64..20_000.0
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    // Height is an integer inside the global range everywhere
    #[test]
    fn height_is_bounded_and_integral(seed in any::<u32>(), x in coord(), z in coord()) {
        let field = field(seed);
        let h = field.sample_height(x, z);
        prop_assert!((2.0..=110.0).contains(&h));
        prop_assert_eq!(h, h.round());
    }

    #[test]
    fn biome_follows_height_rules(seed in any::<u32>(), x in coord(), z in coord()) {
        let field = field(seed);
        let h = field.sample_height(x, z);
        let biome = field.sample_biome(x, z);
        prop_assert!(Biome::ALL.contains(&biome));
        if h <= (SEA_LEVEL + 2) as f64 {
            prop_assert_eq!(biome, Biome::Coast);
        } else {
            prop_assert_ne!(biome, Biome::Coast);
        }
        if h > 82.0 {
            prop_assert_eq!(biome, Biome::Alpine);
        }
    }

    #[test]
    fn sampling_is_deterministic(seed in any::<u32>(), x in coord(), z in coord()) {
        let a = field(seed);
        let b = field(seed);
        prop_assert_eq!(a.sample_height(x, z), b.sample_height(x, z));
        prop_assert_eq!(a.sample_biome(x, z), b.sample_biome(x, z));
        prop_assert_eq!(a.structure_tag(x, z), b.structure_tag(x, z));
        prop_assert_eq!(a.blend_factor(x, z), b.blend_factor(x, z));
    }

    #[test]
    fn blend_factor_is_bounded_and_zoned(x in coord(), z in coord()) {
        let field = field(1);
        let blend = field.blend_factor(x, z);
        prop_assert!((0.0..=1.0).contains(&blend));
        let edge = x.abs().max(z.abs());
        let zone = field.zone(x, z);
        if edge <= 2000.0 {
            prop_assert_eq!(zone, Zone::Core);
        } else if edge >= 2800.0 {
            prop_assert_eq!(zone, Zone::Frontier);
        } else {
            prop_assert_eq!(zone, Zone::Blend);
        }
    }

    // Walking across the core edge and the blend ring never produces a cliff
    #[test]
    fn height_is_continuous_across_the_ring(seed in any::<u32>(), z in -1500.0f64..1500.0) {
        let field = field(seed);
        let mut previous = field.sample_height(1980.0, z);
        let mut x = 1981.0;
        while x <= 2820.0 {
            let h = field.sample_height(x, z);
            prop_assert!((h - previous).abs() <= 4.0, "jump of {} at x={}", h - previous, x);
            previous = h;
            x += 1.0;
        }
    }
}
