use crate::SpineVersion;

#[test]
fn parses_editor_version_strings() {
    assert_eq!(
        SpineVersion::parse("4.2.43"),
        Some(SpineVersion { major: 4, minor: 2 })
    );
    assert_eq!(
        SpineVersion::parse("3.8.99"),
        Some(SpineVersion { major: 3, minor: 8 })
    );
    assert_eq!(
        SpineVersion::parse("4.3-beta"),
        Some(SpineVersion { major: 4, minor: 3 })
    );
    assert_eq!(SpineVersion::parse("4"), Some(SpineVersion { major: 4, minor: 0 }));
    assert_eq!(SpineVersion::parse("x.1"), None);
    assert_eq!(SpineVersion::parse("4.x"), None);
    assert_eq!(SpineVersion::parse(""), None);
}

#[test]
fn supports_3_8_through_4_x() {
    let supported = |v: &str| SpineVersion::parse(v).is_some_and(|v| v.is_supported());
    assert!(supported("3.8.95"));
    assert!(supported("4.0.64"));
    assert!(supported("4.3.00"));
    assert!(!supported("3.7.94"));
    assert!(!supported("2.1.27"));
    assert!(!supported("5.0.0"));
}
