use approx::assert_abs_diff_eq;

use super::{build, dataset, topology, xor_dataset};
use crate::data::Split;
use crate::nn::{ActivationType, ApplyMode, InitType, LayerBuilder, LayerInfo, NNInfo, NetType};

/// 2 → 1(linear) → 1(linear)，权重手工指定
fn linear_chain() -> LayerBuilder {
    let data = dataset(&[vec![1.0, 2.0]], &[vec![0.0]]);
    let info = NNInfo::new(
        "chain",
        vec![LayerInfo::new(1, ActivationType::Linear, InitType::Empty)],
        LayerInfo::new(1, ActivationType::Linear, InitType::Empty),
    );
    let mut builder = build(&info, NetType::FeedForward, &data, 0);
    let layers = builder.layers_mut();
    layers[0].node_mut(0).unwrap().set_weights(&[0.5, -0.25, 0.1]);
    layers[1].node_mut(0).unwrap().set_weights(&[2.0, 0.3]);
    builder.get_input_layer(0, 2, Split::Train);
    builder
}

fn squared_error(outputs: &[f32], targets: &[f32]) -> f32 {
    outputs
        .iter()
        .zip(targets)
        .map(|(y, t)| 0.5 * (y - t) * (y - t))
        .sum()
}

#[test]
fn test_forward_by_hand() {
    let builder = linear_chain();
    // 隐藏: 0.5*1 - 0.25*2 + 0.1 = 0.1；输出: 2.0*0.1 + 0.3 = 0.5
    let output = builder.forward();
    assert_abs_diff_eq!(output[0], 0.5, epsilon = 1e-6);
    assert_abs_diff_eq!(builder.layer(0).unwrap().node(0).unwrap().activation(), 0.1, epsilon = 1e-6);
}

#[test]
fn test_backward_by_hand() {
    let mut builder = linear_chain();
    builder.forward();
    let loss = builder.backward(&[0.0], 1.0, 0.0);
    assert_abs_diff_eq!(loss, 0.125, epsilon = 1e-6);

    // 误差导数回传：dL/dh = (y - t) * w_out = 0.5 * 2.0
    assert_abs_diff_eq!(builder.layer(0).unwrap().node(0).unwrap().err_der(), 1.0, epsilon = 1e-6);

    // 反向只排队，不改权重
    assert_eq!(builder.layer(1).unwrap().node(0).unwrap().weights(), vec![2.0, 0.3]);

    builder.apply_deltas(ApplyMode::Accumulated);
    let output = builder.layer(1).unwrap().node(0).unwrap().weights();
    assert_abs_diff_eq!(output[0], 1.95, epsilon = 1e-6);
    assert_abs_diff_eq!(output[1], -0.2, epsilon = 1e-6);
    let hidden = builder.layer(0).unwrap().node(0).unwrap().weights();
    assert_abs_diff_eq!(hidden[0], -0.5, epsilon = 1e-6);
    assert_abs_diff_eq!(hidden[1], -2.25, epsilon = 1e-6);
    assert_abs_diff_eq!(hidden[2], -0.9, epsilon = 1e-6);
}

#[test]
fn test_momentum_reuses_previous_delta() {
    let mut builder = linear_chain();
    builder.forward();
    builder.backward(&[0.0], 1.0, 0.0);
    builder.apply_deltas(ApplyMode::Accumulated);
    // 输出偏置上一次的增量为 -0.5
    let bias_before = builder.layer(1).unwrap().node(0).unwrap().weight_at(1);

    builder.forward();
    builder.backward(&[0.0], 0.0, 0.5);
    builder.apply_deltas(ApplyMode::Accumulated);
    let bias_after = builder.layer(1).unwrap().node(0).unwrap().weight_at(1);
    assert_abs_diff_eq!(bias_after - bias_before, -0.25, epsilon = 1e-6);
}

/// 单步时上下文为常量 0，截断梯度与数值梯度一致
fn check_gradients(net_type: NetType) {
    let data = dataset(&[vec![0.3, -0.7]], &[vec![0.9]]);
    let targets = [0.9];
    let mut builder = build(&topology(&[3], 1, InitType::Random), net_type, &data, 21);
    builder.get_input_layer(0, 2, Split::Train);

    builder.reset_context_state(0.0);
    builder.forward();
    builder.backward(&targets, 1.0, 0.0);

    let eps = 1e-2;
    for layer in 0..builder.layer_count() {
        let edges = builder.layer(layer).unwrap().edges_per_node();
        for edge in 0..edges {
            // lr = 1、无动量时排队的增量为 -dL/dw
            let analytic = -builder.layer(layer).unwrap().node(0).unwrap().edges()[edge].pending();

            let w = builder.layer(layer).unwrap().node(0).unwrap().weight_at(edge);
            let mut loss_at = |value: f32| {
                builder.layers_mut()[layer]
                    .node_mut(0)
                    .unwrap()
                    .set_weight_at(edge, value);
                builder.reset_context_state(0.0);
                squared_error(&builder.forward(), &targets)
            };
            let numeric = (loss_at(w + eps) - loss_at(w - eps)) / (2.0 * eps);
            loss_at(w);

            assert_abs_diff_eq!(analytic, numeric, epsilon = 2e-3);
        }
    }
}

#[test]
fn test_feed_forward_gradients() {
    check_gradients(NetType::FeedForward);
}

#[test]
fn test_rnn_gradients() {
    check_gradients(NetType::Rnn);
}

#[test]
fn test_gru_gradients() {
    check_gradients(NetType::Gru);
}

#[test]
fn test_lstm_gradients() {
    check_gradients(NetType::Lstm);
}

#[test]
fn test_dropped_node_outputs_zero_and_is_frozen() {
    let data = xor_dataset();
    let mut builder = build(&topology(&[4], 1, InitType::Random), NetType::FeedForward, &data, 8);
    builder.scramble_dropout(0, 0.0, Some(&[true, false, false, false]));
    let frozen = builder.layer(0).unwrap().node(0).unwrap().weights();
    let active = builder.layer(0).unwrap().node(1).unwrap().weights();

    builder.get_input_layer(3, 2, Split::Train);
    builder.forward();
    assert_eq!(builder.layer(0).unwrap().node(0).unwrap().activation(), 0.0);

    builder.backward(&[0.0], 0.5, 0.0);
    builder.apply_deltas(ApplyMode::Accumulated);
    assert_eq!(builder.layer(0).unwrap().node(0).unwrap().weights(), frozen);
    assert_ne!(builder.layer(0).unwrap().node(1).unwrap().weights(), active);
}

#[test]
fn test_loss_decreases() {
    let data = xor_dataset();
    let mut builder = build(&topology(&[4], 1, InitType::Xavier), NetType::FeedForward, &data, 9);
    builder.get_input_layer(1, 2, Split::Train);

    builder.forward();
    let first = builder.backward(&[1.0], 0.5, 0.0);
    builder.apply_deltas(ApplyMode::Accumulated);
    for _ in 0..20 {
        builder.forward();
        builder.backward(&[1.0], 0.5, 0.0);
        builder.apply_deltas(ApplyMode::Accumulated);
    }
    builder.forward();
    let last = builder.backward(&[1.0], 0.0, 0.0);
    assert!(last < first, "{last} >= {first}");
}

#[test]
fn test_parallel_forward_matches_sequential() {
    let data = xor_dataset();
    let info = topology(&[16, 8], 1, InitType::Xavier);
    for net_type in [NetType::FeedForward, NetType::Gru, NetType::Lstm] {
        let mut sequential = build(&info, net_type, &data, 10);
        let mut parallel = build(&info, net_type, &data, 10);
        parallel.set_parallel(true);
        assert!(parallel.is_parallel());

        for row in 0..4 {
            sequential.get_input_layer(row, 2, Split::Train);
            parallel.get_input_layer(row, 2, Split::Train);
            let expected = sequential.forward();
            let actual = parallel.forward();
            if row == 0 {
                // 尚未更新权重，逐节点运算完全相同
                assert_eq!(expected, actual);
                assert_eq!(sequential.activations_snapshot(), parallel.activations_snapshot());
            }
            for (a, b) in expected.iter().zip(&actual) {
                assert_abs_diff_eq!(a, b, epsilon = 1e-5);
            }

            sequential.backward(&[1.0], 0.1, 0.5);
            parallel.backward(&[1.0], 0.1, 0.5);
            sequential.apply_deltas(ApplyMode::Accumulated);
            parallel.apply_deltas(ApplyMode::Accumulated);
            sequential.update_context_from_hidden_activations();
            parallel.update_context_from_hidden_activations();
        }

        for (a, b) in super::all_weights(&sequential)
            .iter()
            .flatten()
            .flatten()
            .zip(super::all_weights(&parallel).iter().flatten().flatten())
        {
            assert_abs_diff_eq!(a, b, epsilon = 1e-5);
        }
    }
}
