use super::*;

#[test]
fn shared_footprint_test() {
    // 25 kernel values plus a 20x20 halo tile
    assert_eq!(
        shared_footprint_bytes(Dim3::xy(16, 16), Size::new(5, 5)),
        (25 + 400) * 4
    );
    // non-square: tile is (8 + 3 - 1) rows by (16 + 5 - 1) cols
    assert_eq!(
        shared_footprint_bytes(Dim3::xy(16, 8), Size::new(3, 5)),
        (15 + 10 * 20) * 4
    );
}

#[test]
fn plan_tiles_keeps_fitting_block_test() {
    let config = DeviceConfig::default();
    let plan = plan_tiles(&config, Dim3::new(3, 2, 5), Dim3::xy(16, 16), Size::new(5, 5)).unwrap();

    assert_eq!(plan.block, Dim3::xy(16, 16));
    assert_eq!(plan.grid, Dim3::new(3, 2, 5));
    assert_eq!(plan.shared_memory_bytes, 1700);
}

#[test]
fn plan_tiles_halves_rows_on_tie_test() {
    // 16x16 needs 657 floats, 16x8 needs 465 and fits 512
    let config = DeviceConfig::default().with_shared_memory_per_block(2048);
    let plan = plan_tiles(&config, Dim3::new(2, 2, 1), Dim3::xy(16, 16), Size::new(9, 9)).unwrap();

    assert_eq!(plan.block, Dim3::xy(16, 8));
    assert_eq!(plan.grid, Dim3::new(2, 4, 1));
    assert_eq!(plan.shared_memory_bytes, 465 * 4);
}

#[test]
fn plan_tiles_halves_larger_axis_test() {
    // 16x8 still needs 465 floats, then columns are the larger axis
    let config = DeviceConfig::default().with_shared_memory_per_block(1600);
    let plan = plan_tiles(&config, Dim3::new(2, 2, 3), Dim3::xy(16, 16), Size::new(9, 9)).unwrap();

    assert_eq!(plan.block, Dim3::xy(8, 8));
    assert_eq!(plan.grid, Dim3::new(4, 4, 3));
    assert_eq!(plan.shared_memory_bytes, (81 + 16 * 16) * 4);
    assert!(plan.shared_memory_bytes <= 1600);
}

#[test]
fn plan_tiles_preserves_coverage_test() {
    let config = DeviceConfig::default().with_shared_memory_per_block(1600);
    let grid = Dim3::new(2, 3, 1);
    let block = Dim3::xy(16, 16);
    let plan = plan_tiles(&config, grid, block, Size::new(9, 9)).unwrap();

    assert!(plan.grid.x * plan.block.x >= grid.x * block.x);
    assert!(plan.grid.y * plan.block.y >= grid.y * block.y);
}

#[test]
fn plan_tiles_resource_error_test() {
    // The 33x33 kernel alone is larger than the budget
    let config = DeviceConfig::default().with_shared_memory_per_block(4096);
    let result = plan_tiles(&config, Dim3::new(1, 1, 1), Dim3::xy(16, 16), Size::new(33, 33));

    assert!(matches!(result, Err(ModelError::ResourceError(_))));
}

#[test]
fn plan_tiles_empty_kernel_test() {
    let config = DeviceConfig::default();
    let result = plan_tiles(&config, Dim3::new(1, 1, 1), Dim3::xy(16, 16), Size::new(0, 3));

    assert!(matches!(result, Err(ModelError::ConfigurationError(_))));
}

#[test]
fn device_plan_tiles_is_memoized_test() {
    let device =
        Device::new(DeviceConfig::default().with_shared_memory_per_block(2048)).unwrap();

    let first = device.plan_tiles(Size::new(30, 30), 4, Size::new(9, 9)).unwrap();
    let second = device.plan_tiles(Size::new(30, 30), 4, Size::new(9, 9)).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.block, Dim3::xy(16, 8));
    assert_eq!(first.grid, Dim3::new(2, 4, 4));
}
