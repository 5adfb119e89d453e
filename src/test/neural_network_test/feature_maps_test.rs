use super::*;

#[test]
fn feature_maps_layout_test() {
    let maps = FeatureMaps::from_shape_fn(2, Size::new(2, 3), 2, |b, m, r, c| {
        (b * 1000 + m * 100 + r * 10 + c) as f32
    });

    assert_eq!(maps.rows(), 12);
    assert_eq!(maps.map_offset(1), 6);
    // sample 1, map 0, pixel (1, 2)
    assert_eq!(maps.as_slice()[12 + 5], 1012.0);
    assert_eq!(maps.image(1, 1), array![[1100.0, 1101.0, 1102.0], [1110.0, 1111.0, 1112.0]]);

    let matrix = maps.to_matrix();
    assert_eq!(matrix.dim(), (2, 12));
    assert_eq!(FeatureMaps::from_matrix(2, Size::new(2, 3), &matrix).unwrap(), maps);
}

#[test]
fn feature_maps_from_vec_validation_test() {
    assert!(matches!(
        FeatureMaps::from_vec(2, Size::new(2, 2), vec![0.0; 7]),
        Err(ModelError::InputValidationError(_))
    ));

    let maps = FeatureMaps::from_vec(2, Size::new(2, 2), vec![0.0; 24]).unwrap();
    assert_eq!(maps.batch_size(), 3);

    let matrix = Array2::<f32>::zeros((3, 5));
    assert!(matches!(
        FeatureMaps::from_matrix(2, Size::new(2, 2), &matrix),
        Err(ModelError::InputValidationError(_))
    ));
}

#[test]
fn feature_maps_broadcast_and_sum_test() {
    let mut maps = FeatureMaps::zeros(3, Size::new(2, 2), 2);
    maps.broadcast_per_map(&[1.0, -2.0, 0.5]);

    assert_eq!(maps.image(1, 1), Array2::from_elem((2, 2), -2.0));
    // 4 pixels in each of 2 samples
    assert_relative_eq!(maps.map_sum(0), 8.0);
    assert_relative_eq!(maps.map_sum(1), -16.0);
    assert_relative_eq!(maps.map_sum(2), 4.0);

    maps.scale(2.0);
    assert_relative_eq!(maps.map_sum(2), 8.0);
}

#[test]
fn feature_maps_resize_clears_test() {
    let mut maps = FeatureMaps::from_shape_fn(1, Size::new(3, 3), 1, |_, _, _, _| 7.0);
    maps.resize(2, Size::new(2, 2), 4);

    assert_eq!(maps.maps(), 2);
    assert_eq!(maps.image_size(), Size::new(2, 2));
    assert_eq!(maps.batch_size(), 4);
    assert_eq!(maps.as_slice().len(), 32);
    assert!(maps.as_slice().iter().all(|&v| v == 0.0));
}

#[test]
#[should_panic(expected = "image (0, 2) out of range for 1 samples of 2 feature maps")]
fn feature_maps_image_out_of_range_test() {
    let maps = FeatureMaps::zeros(2, Size::new(3, 3), 1);
    maps.image(0, 2);
}

#[test]
#[should_panic(expected = "map index 3 out of range for 3 feature maps")]
fn feature_maps_map_sum_out_of_range_test() {
    // Without the check this would read into the next sample
    let maps = FeatureMaps::zeros(3, Size::new(2, 2), 2);
    maps.map_sum(3);
}

#[test]
fn feature_maps_window_test() {
    let maps = FeatureMaps::from_shape_fn(2, Size::new(4, 5), 2, |b, m, r, c| {
        (b * 1000 + m * 100 + r * 10 + c) as f32
    });

    let window = maps.window(1, (1, 2), Size::new(2, 3));
    assert_eq!(
        window,
        vec![
            112.0, 113.0, 114.0, 122.0, 123.0, 124.0, //
            1112.0, 1113.0, 1114.0, 1122.0, 1123.0, 1124.0,
        ]
    );
}
