use super::*;

#[test]
fn size_arithmetic_test() {
    let image = Size::new(28, 24);
    let kernel = Size::new(5, 3);

    assert_eq!(image + kernel, Size::new(33, 27));
    assert_eq!(image - kernel, Size::new(23, 21));
    assert_eq!(image / Size::new(2, 3), Size::new(14, 8));
    assert_eq!(image / 5, Size::new(5, 4));
    assert_eq!(image.area(), 672);
    assert_eq!(image.min(Size::new(30, 10)), Size::new(28, 10));
}

#[test]
fn size_subtraction_saturates_test() {
    assert_eq!(Size::new(3, 10) - Size::new(5, 4), Size::new(0, 6));
    assert!((Size::new(3, 10) - Size::new(5, 4)).is_empty());
    assert!(!Size::square(1).is_empty());
}

#[test]
fn size_conversion_and_display_test() {
    let size = Size::from((7, 9));
    assert_eq!(size, Size::new(7, 9));
    assert_eq!(size.to_string(), "7x9");
    assert_eq!(Size::default(), Size::new(0, 0));
}
