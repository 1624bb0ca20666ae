/*
 * @Author       : 老董
 * @Date         : 2026-02-10
 * @Description  : XOR（异或）问题测试 - 经典的非线性分类问题，需要隐藏层+非线性激活才能解决
 *                 网络结构：Input(2) -> Hidden(4, Tanh) -> Output(1, Sigmoid)
 */
use std::sync::Arc;

use only_nn::data::{Split, TableDataset};
use only_nn::nn::{
    ActivationType, InitType, LayerBuilder, LayerInfo, NNInfo, NetType, Trainer, TrainingInfo,
};

/// XOR问题训练数据
/// 输入: (0,0), (0,1), (1,0), (1,1)
/// 输出: 0, 1, 1, 0
fn get_xor_data() -> Arc<TableDataset> {
    let features = vec![
        vec![0.0, 0.0],
        vec![0.0, 1.0],
        vec![1.0, 0.0],
        vec![1.0, 1.0],
    ];
    let targets = vec![vec![0.0], vec![1.0], vec![1.0], vec![0.0]];
    Arc::new(TableDataset::from_rows(&features, &targets, 1.0).unwrap())
}

fn xor_info(seed: u64) -> NNInfo {
    let mut info = NNInfo::new(
        "xor",
        vec![LayerInfo::new(4, ActivationType::Tanh, InitType::Xavier)],
        LayerInfo::new(1, ActivationType::Sigmoid, InitType::Xavier),
    );
    info.training = TrainingInfo {
        epochs: 2000,
        learning_rate: 0.5,
        momentum: 0.5,
        seed: Some(seed),
        ..TrainingInfo::default()
    };
    info
}

/// 训练后 4 个样本是否全部分类正确
fn solved(builder: &mut LayerBuilder, data: &TableDataset) -> bool {
    (0..4).all(|row| {
        builder.get_input_layer(row, 2, Split::Train);
        let output = builder.forward()[0];
        let expected = data.targets()[[row, 0]];
        (output > 0.5) == (expected > 0.5)
    })
}

#[test]
fn test_xor() {
    let start_time = std::time::Instant::now();
    let data = get_xor_data();

    // 个别种子可能陷入局部极小，换几个种子重试
    let mut test_passed = false;
    for seed in [42_u64, 7, 2026, 1] {
        let info = xor_info(seed);
        let mut builder = LayerBuilder::new();
        builder.set_seed(seed);
        builder
            .build(&info, data.clone(), NetType::FeedForward, false)
            .unwrap();

        let report = Trainer::new(info.training.clone())
            .train(&mut builder, data.clone())
            .unwrap();
        println!(
            "种子 {}: 首回合损失 {:.4}, 末回合损失 {:.4}",
            seed,
            report.epoch_losses[0],
            report.final_loss().unwrap()
        );

        builder.attach_data_input(data.clone());
        if solved(&mut builder, &data) {
            for row in 0..4 {
                builder.get_input_layer(row, 2, Split::Train);
                let output = builder.forward()[0];
                let input = builder.input_layer().activations();
                println!(
                    "XOR({}, {}) = {} (原始输出: {:.4})",
                    input[0],
                    input[1],
                    data.targets()[[row, 0]],
                    output
                );
            }
            test_passed = true;
            break;
        }
    }

    println!("总耗时: {:.2?}", start_time.elapsed());
    assert!(test_passed, "XOR 未能在任何种子下学会");
}
