/*!
 * Tests for marker and content validation
 */

use mdtrans::validation::{ContentValidator, MarkerValidator, extract_markers};

fn markers(list: &[&str]) -> Vec<String> {
    list.iter().map(|m| m.to_string()).collect()
}

#[test]
fn test_extractMarkers_withMixedMarkers_shouldKeepOrder() {
    assert_eq!(
        extract_markers("x __GL1__ y __PH0__ __PH10__ z __PHX__"),
        markers(&["__GL1__", "__PH0__", "__PH10__"])
    );
}

#[test]
fn test_validate_withCases_shouldClassify() {
    let expected = markers(&["__PH0__", "__GL0__", "__PH1__"]);
    // (text, passed, restorable)
    let cases = [
        ("a __PH0__ b __GL0__ c __PH1__", true, true),
        ("a __PH1__ b __GL0__ c __PH0__", false, true),
        ("a __PH0__ c __PH1__", false, false),
        ("a __PH0__ __PH0__ __GL0__ __PH1__", false, false),
        ("a __PH0__ __GL0__ __PH1__ __PH7__", false, false),
    ];

    for (text, passed, restorable) in cases {
        let result = MarkerValidator::validate(&expected, text);
        assert_eq!(result.passed(), passed, "{}", text);
        assert_eq!(result.restorable(), restorable, "{}", text);
    }
}

#[test]
fn test_validate_withMissingMarker_shouldExplain() {
    let result = MarkerValidator::validate(&markers(&["__PH0__", "__PH1__"]), "only __PH1__");
    assert_eq!(result.missing, markers(&["__PH0__"]));
    assert!(result.error_message.is_some());
}

#[test]
fn test_contentCheck_withReformattedNumbers_shouldReport() {
    let result = ContentValidator::check("Version 2.0 ships 3 fixes", "Version 2,0 liefert 3 Fixes");
    assert_eq!(result.missing_numbers, markers(&["2.0"]));
    assert!(result.missing_links.is_empty());
}
