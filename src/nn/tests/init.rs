use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::nn::{ActivationType, InitType, Initializer, POSITIVE_RANDOM_RANGE, RANDOM_RANGE};

fn sample(scheme: InitType, fan_in: usize, activation: ActivationType) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(11);
    Initializer::new(scheme, fan_in, activation).generate(500, &mut rng)
}

#[test]
fn test_empty_is_zero() {
    assert!(sample(InitType::Empty, 4, ActivationType::Sigmoid)
        .iter()
        .all(|&w| w == 0.0));
}

#[test]
fn test_random_ranges() {
    let random = sample(InitType::Random, 4, ActivationType::Sigmoid);
    assert!(random.iter().all(|w| w.abs() <= RANDOM_RANGE));
    assert!(random.iter().any(|&w| w < 0.0));

    let positive = sample(InitType::PosRand, 4, ActivationType::Sigmoid);
    assert!(positive
        .iter()
        .all(|&w| (0.0..=POSITIVE_RANDOM_RANGE).contains(&w)));
}

#[test]
fn test_xavier_limits() {
    // fan_in = 16：饱和型界为 1/4，整流类为 sqrt(2)/4
    let tanh = Initializer::new(InitType::Xavier, 16, ActivationType::Tanh);
    assert_eq!(tanh.xavier_limit(), 0.25);
    let relu = Initializer::new(InitType::Xavier, 16, ActivationType::Relu);
    assert_eq!(relu.xavier_limit(), std::f32::consts::SQRT_2 / 4.0);

    let saturating = sample(InitType::Xavier, 16, ActivationType::Tanh);
    assert!(saturating.iter().all(|w| w.abs() <= 0.25));
    assert!(saturating.iter().any(|&w| w < 0.0));

    let positive = sample(InitType::PosXavier, 16, ActivationType::Relu);
    assert!(positive
        .iter()
        .all(|&w| (0.0..=relu.xavier_limit()).contains(&w)));
}

#[test]
fn test_seeded_generation_is_reproducible() {
    let a = sample(InitType::Xavier, 5, ActivationType::Sigmoid);
    let b = sample(InitType::Xavier, 5, ActivationType::Sigmoid);
    assert_eq!(a, b);
}
