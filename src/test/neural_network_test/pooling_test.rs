use super::*;

#[test]
fn downsample_block_means_test() {
    let device = Device::default();
    let data: Vec<f32> = (0..2 * 16).map(|v| v as f32).collect();
    let mut output = vec![0.0f32; 2 * 4];

    downsample(&device, &data, &mut output, Size::new(4, 4), 2, 2).unwrap();

    // image 0 block (0, 0) holds 0, 1, 4, 5
    assert_eq!(&output[..4], &[2.5, 4.5, 10.5, 12.5]);
    // image 1 is image 0 shifted by 16
    assert_eq!(&output[4..], &[18.5, 20.5, 26.5, 28.5]);
}

#[test]
fn downsample_drops_partial_blocks_test() {
    let device = Device::default();
    let data = vec![1.0f32; 25];
    let mut output = vec![0.0f32; 4];

    downsample(&device, &data, &mut output, Size::new(5, 5), 2, 1).unwrap();
    assert!(output.iter().all(|&v| v == 1.0));
}

#[test]
fn upsample_replicates_test() {
    let device = Device::default();
    let data = vec![1.0f32, 2.0, 3.0, 4.0];
    let mut output = vec![-1.0f32; 25];

    upsample(&device, &data, &mut output, Size::new(5, 5), 2, 1).unwrap();
    let output = Array2::from_shape_vec((5, 5), output).unwrap();

    assert_eq!(
        output,
        array![
            [1.0, 1.0, 2.0, 2.0, 0.0],
            [1.0, 1.0, 2.0, 2.0, 0.0],
            [3.0, 3.0, 4.0, 4.0, 0.0],
            [3.0, 3.0, 4.0, 4.0, 0.0],
            [0.0, 0.0, 0.0, 0.0, 0.0],
        ]
    );
}

#[test]
fn constant_blocks_survive_round_trip_test() {
    let device = Device::default();
    let count = 3;
    let size = Size::new(6, 9);
    let pooled: Vec<f32> = (0..count * 6).map(|v| v as f32 * 0.5).collect();
    let mut image = vec![0.0f32; count * size.area()];
    let mut back = vec![0.0f32; pooled.len()];

    upsample(&device, &pooled, &mut image, size, 3, count).unwrap();
    downsample(&device, &image, &mut back, size, 3, count).unwrap();

    for (a, e) in back.iter().zip(pooled.iter()) {
        assert_relative_eq!(*a, *e, epsilon = 1e-6);
    }
}

#[test]
fn round_trip_broadcasts_block_mean_test() {
    let device = Device::default();
    let mut rng = StdRng::seed_from_u64(23);
    let image = random_image(&mut rng, 6, 4);
    let data: Vec<f32> = image.iter().copied().collect();
    let mut pooled = vec![0.0f32; 6];
    let mut back = vec![0.0f32; 24];

    downsample(&device, &data, &mut pooled, Size::new(6, 4), 2, 1).unwrap();
    upsample(&device, &pooled, &mut back, Size::new(6, 4), 2, 1).unwrap();

    for r in 0..6 {
        for c in 0..4 {
            let (br, bc) = (r / 2 * 2, c / 2 * 2);
            let mean = image.slice(s![br..br + 2, bc..bc + 2]).sum() / 4.0;
            assert_relative_eq!(back[r * 4 + c], mean, epsilon = 1e-6);
        }
    }
}

#[test]
fn pooling_validation_test() {
    let device = Device::default();
    let data = vec![0.0f32; 16];
    let mut output = vec![0.0f32; 4];

    assert!(matches!(
        downsample(&device, &data, &mut output, Size::new(4, 4), 0, 1),
        Err(ModelError::ConfigurationError(_))
    ));
    assert!(matches!(
        downsample(&device, &data, &mut output, Size::new(4, 4), 2, 2),
        Err(ModelError::InputValidationError(_))
    ));
    assert!(matches!(
        upsample(&device, &output.clone(), &mut output, Size::new(4, 4), 2, 1),
        Err(ModelError::InputValidationError(_))
    ));
}
