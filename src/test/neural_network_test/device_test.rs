use super::*;

fn fill_launch(device: &Device, output: &mut [f32], mode: WriteMode) -> Result<(), ModelError> {
    let config = LaunchConfig::covering(Size::new(1, output.len()), Dim3::xy(4, 1), 1);
    let len = output.len();

    device.launch("fill", &config, output, mode, |ctx, _shared| {
        ctx.threads()
            .map(|t| ctx.global_pixel(t).1)
            .filter(|&c| c < len)
            .map(|c| (c, c as f32))
            .collect()
    })
}

#[test]
fn device_config_validation_test() {
    assert!(Device::new(DeviceConfig::default()).is_ok());

    let not_power_of_two = DeviceConfig::default().with_block_dim(12, 16);
    assert!(matches!(
        Device::new(not_power_of_two),
        Err(ModelError::ConfigurationError(_))
    ));

    let too_many_threads = DeviceConfig::default().with_block_dim(64, 32);
    assert!(matches!(
        Device::new(too_many_threads),
        Err(ModelError::ConfigurationError(_))
    ));

    let no_shared_memory = DeviceConfig::default().with_shared_memory_per_block(0);
    assert!(matches!(
        Device::new(no_shared_memory),
        Err(ModelError::ConfigurationError(_))
    ));
}

#[test]
fn launch_store_and_accumulate_test() {
    let device = Device::default();
    let mut output = vec![1.0f32; 10];

    fill_launch(&device, &mut output, WriteMode::Store).unwrap();
    assert_eq!(output, (0..10).map(|v| v as f32).collect::<Vec<_>>());

    fill_launch(&device, &mut output, WriteMode::Accumulate).unwrap();
    assert_eq!(output, (0..10).map(|v| 2.0 * v as f32).collect::<Vec<_>>());

    assert_eq!(device.launch_count(), 2);
    device.synchronize().unwrap();
}

#[test]
fn launch_out_of_bounds_test() {
    let device = Device::default();
    let mut output = vec![0.0f32; 4];
    let config = LaunchConfig::covering(Size::new(1, 8), Dim3::xy(8, 1), 1);

    let result = device.launch("overrun", &config, &mut output, WriteMode::Store, |ctx, _| {
        ctx.threads().map(|t| (ctx.linear_id(t), 1.0)).collect()
    });

    assert!(matches!(result, Err(ModelError::DeviceError(_))));
}

#[test]
fn launch_invalid_configuration_test() {
    let device = Device::default();
    let mut output = vec![0.0f32; 4];

    let empty_grid = LaunchConfig {
        grid: Dim3::new(0, 1, 1),
        block: Dim3::xy(4, 1),
        shared_memory_bytes: 0,
    };
    let result = device.launch("empty", &empty_grid, &mut output, WriteMode::Store, |_, _| Vec::new());
    assert!(matches!(result, Err(ModelError::DeviceError(_))));

    let oversized_block = LaunchConfig {
        grid: Dim3::new(1, 1, 1),
        block: Dim3::xy(64, 32),
        shared_memory_bytes: 0,
    };
    let result = device.launch("big", &oversized_block, &mut output, WriteMode::Store, |_, _| Vec::new());
    assert!(matches!(result, Err(ModelError::DeviceError(_))));

    let too_much_shared = LaunchConfig {
        grid: Dim3::new(1, 1, 1),
        block: Dim3::xy(4, 1),
        shared_memory_bytes: 64 * 1024,
    };
    let result = device.launch("shared", &too_much_shared, &mut output, WriteMode::Store, |_, _| Vec::new());
    assert!(matches!(result, Err(ModelError::DeviceError(_))));

    assert_eq!(device.launch_count(), 0);
}

#[test]
fn launch_shared_memory_is_private_and_zeroed_test() {
    let device = Device::default();
    let config = LaunchConfig {
        grid: Dim3::new(3, 2, 2),
        block: Dim3::xy(2, 2),
        shared_memory_bytes: 16 * FLOAT_BYTES,
    };
    let mut output = vec![0.0f32; config.grid.volume()];

    device
        .launch("scratch", &config, &mut output, WriteMode::Store, |ctx, shared| {
            assert_eq!(shared.len(), 16);
            assert!(shared.iter().all(|&v| v == 0.0));
            shared.fill(ctx.block_idx.x as f32);

            let b = ctx.block_idx;
            let index = (b.z * ctx.grid_dim.y + b.y) * ctx.grid_dim.x + b.x;
            vec![(index, shared.iter().sum::<f32>())]
        })
        .unwrap();

    for (index, value) in output.iter().enumerate() {
        assert_eq!(*value, 16.0 * (index % 3) as f32);
    }
}

#[test]
fn launch_parallel_matches_sequential_test() {
    let sequential = Device::default();
    let mut config = DeviceConfig::default();
    config.parallel_threshold = 1;
    let parallel = Device::new(config).unwrap();

    let launch = LaunchConfig::covering(Size::new(40, 50), Dim3::xy(16, 16), 3);
    let run = |device: &Device| {
        let mut output = vec![0.0f32; 40 * 50];
        device
            .launch("sum", &launch, &mut output, WriteMode::Accumulate, |ctx, _| {
                ctx.threads()
                    .map(|t| ctx.global_pixel(t))
                    .filter(|&(r, c)| r < 40 && c < 50)
                    .map(|(r, c)| (r * 50 + c, (r + c + ctx.block_idx.z) as f32))
                    .collect()
            })
            .unwrap();
        output
    };

    assert_eq!(run(&sequential), run(&parallel));
}
