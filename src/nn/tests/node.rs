use approx::assert_abs_diff_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::nn::{ActivationType, ApplyMode, InitType, Initializer, Node};

fn constant_node(count: usize, value: f32) -> Node {
    let mut node = Node::new(0);
    node.init_constant(count, value);
    node
}

#[test]
fn test_init_weights_with_preset() {
    let mut rng = StdRng::seed_from_u64(1);
    let initializer = Initializer::new(InitType::Empty, 3, ActivationType::Sigmoid);
    let mut node = Node::new(5);
    node.init_weights_with_preset(4, &[0.1, 0.2], &initializer, &mut rng);

    assert_eq!(node.id(), 5);
    assert_eq!(node.weights(), vec![0.1, 0.2, 0.0, 0.0]);
    // 边 id 即其在节点内的下标
    let ids: Vec<u64> = node.edges().iter().map(|e| e.id()).collect();
    assert_eq!(ids, vec![0, 1, 2, 3]);

    // 预设比边数长时被截断
    node.init_weights_with_preset(2, &[1.0, 2.0, 3.0], &initializer, &mut rng);
    assert_eq!(node.weights(), vec![1.0, 2.0]);
}

#[test]
fn test_out_of_range_access_is_neutral() {
    let mut node = constant_node(3, 0.5);
    assert!(node.edge(3).is_none());
    assert_eq!(node.weight_at(99), 0.0);
    node.set_weight_at(99, 1.0);
    node.queue_delta(99, 1.0);
    assert_eq!(node.weights(), vec![0.5; 3]);
    assert_eq!(node.get_delta(99, 1.0, 1.0, 0.1, 0.9), 0.0);
}

#[test]
fn test_get_delta_uses_last_committed_delta() {
    let mut node = constant_node(2, 0.5);
    node.queue_delta(0, 0.2);
    node.apply_deltas(2, ApplyMode::Accumulated);
    assert_abs_diff_eq!(node.weight_at(0), 0.7);
    assert_abs_diff_eq!(node.edges()[0].last_delta(), 0.2);

    // -lr * grad * src + momentum * last = -0.1 * 1.0 * 0.5 + 0.9 * 0.2
    let delta = node.get_delta(0, 1.0, 0.5, 0.1, 0.9);
    assert_abs_diff_eq!(delta, 0.13, epsilon = 1e-6);
    // 边 1 没有历史增量，只有梯度项
    let delta = node.get_delta(1, 1.0, 0.5, 0.1, 0.9);
    assert_abs_diff_eq!(delta, -0.05, epsilon = 1e-6);
}

#[test]
fn test_apply_deltas_modes() {
    let mut node = constant_node(3, 0.0);
    for edge in 0..3 {
        node.queue_delta(edge, 0.4);
    }
    node.apply_deltas(1, ApplyMode::Averaged { batch: 4 });
    assert_abs_diff_eq!(node.weight_at(0), 0.1);
    // 只提交了前 1 条边
    assert_eq!(node.weight_at(1), 0.0);
    assert_abs_diff_eq!(node.edges()[1].pending(), 0.4);

    node.apply_deltas(10, ApplyMode::Accumulated);
    assert_abs_diff_eq!(node.weight_at(1), 0.4);
    assert_abs_diff_eq!(node.weight_at(2), 0.4);
}

#[test]
fn test_err_der_accumulates_across_threads() {
    let node = constant_node(1, 0.0);
    (0..100).into_par_iter().for_each(|_| node.adjust_err_der(0.5));
    assert_abs_diff_eq!(node.err_der(), 50.0);

    node.clear_err_der();
    assert_eq!(node.err_der(), 0.0);
}

#[test]
fn test_state_accessors() {
    let node = Node::new(0);
    node.set_activation(0.75);
    node.update_state(|s| {
        s.activation_scalar = 1.5;
        s.cell = 2.0;
    });
    assert_eq!(node.activation(), 0.75);
    assert_eq!(node.activation_scalar(), 1.5);
    assert_eq!(node.state().cell, 2.0);

    node.clear_recurrent_state();
    assert_eq!(node.state().cell, 0.0);
    node.clear_activation();
    assert_eq!(node.activation(), 0.0);
    assert_eq!(node.activation_scalar(), 0.0);
}

#[test]
fn test_clean_releases_edges() {
    let mut node = constant_node(4, 1.0);
    node.set_activation(3.0);
    node.clean();
    assert_eq!(node.num_edges(), 0);
    assert_eq!(node.activation(), 0.0);
    assert_eq!(node.bias(), 0.0);
}
