use super::*;

fn rules() -> CouponDetailRules {
    CouponDetailRules::from_config("test", &DetailConfig::default()).unwrap()
}

#[test]
fn reads_code_from_visible_text() {
    let html = r#"<html><body><h1>Acme deal</h1><span class="coupon-code"> save10 </span></body></html>"#;
    let record = rules().extract(html, "https://deals.example/acme");
    assert_eq!(record.code.as_deref(), Some("SAVE10"));
    assert_eq!(record.title.as_deref(), Some("Acme deal"));
}

#[test]
fn falls_back_to_clipboard_attribute_when_text_is_a_button_label() {
    let html = r#"<html><body>
        <button class="copy-code" data-clipboard-text="spring25">Copy</button>
    </body></html>"#;
    let record = rules().extract(html, "https://deals.example/acme");
    assert_eq!(record.code.as_deref(), Some("SPRING25"));
}

#[test]
fn configured_clipboard_attribute_is_tried_first() {
    let config = DetailConfig {
        code_selector: Some("a.reveal".to_string()),
        clipboard_attribute: Some("data-secret".to_string()),
        ..DetailConfig::default()
    };
    let rules = CouponDetailRules::from_config("test", &config).unwrap();
    let html = r#"<a class="reveal" data-secret="vip5" data-code="WRONG">Show Code</a>"#;
    assert_eq!(rules.extract(html, "u").code.as_deref(), Some("VIP5"));
}

#[test]
fn clipboard_element_outside_the_code_selector_still_yields_a_code() {
    let config = DetailConfig {
        code_selector: Some(".coupon-code".to_string()),
        clipboard_attribute: Some("data-copy".to_string()),
        ..DetailConfig::default()
    };
    let rules = CouponDetailRules::from_config("test", &config).unwrap();
    let html = r#"<html><body><button class="btn" data-copy="save10">Copy</button></body></html>"#;
    assert_eq!(rules.extract(html, "u").code.as_deref(), Some("SAVE10"));
}

#[test]
fn common_clipboard_attributes_are_scanned_page_wide() {
    let config = DetailConfig {
        code_selector: Some(".coupon-code".to_string()),
        ..DetailConfig::default()
    };
    let rules = CouponDetailRules::from_config("test", &config).unwrap();
    let html = r#"<a class="reveal" data-promo="fall15">Reveal</a>"#;
    assert_eq!(rules.extract(html, "u").code.as_deref(), Some("FALL15"));
}

#[test]
fn unparseable_clipboard_attribute_is_rejected() {
    let config = DetailConfig {
        clipboard_attribute: Some("data copy]".to_string()),
        ..DetailConfig::default()
    };
    let err = CouponDetailRules::from_config("test", &config).unwrap_err();
    assert!(matches!(err, ScraperError::InvalidSelector { .. }), "got {err:?}");
}

#[test]
fn terms_are_length_filtered_deduplicated_and_capped() {
    let mut items = String::new();
    items.push_str("<li>Too short.</li>");
    items.push_str("<li>We use cookies to improve your shopping experience here.</li>");
    for i in 0..15 {
        items.push_str(&format!("<li>Valid on orders over ${i}0 placed online only.</li>"));
    }
    items.push_str("<li>Valid on orders over $00 placed online only.</li>");
    let long = "x".repeat(MAX_TERM_CHARS + 1);
    items.push_str(&format!("<li>{long}</li>"));
    let html = format!(r#"<div class="terms"><ul>{items}</ul></div>"#);

    let terms = rules().extract(&html, "u").terms;
    assert_eq!(terms.len(), MAX_TERMS);
    assert_eq!(terms[0], "Valid on orders over $00 placed online only.");
    assert!(terms.iter().all(|t| !t.contains("cookies")));
    assert!(terms
        .iter()
        .all(|t| (MIN_TERM_CHARS..=MAX_TERM_CHARS).contains(&t.chars().count())));
}

#[test]
fn terms_fall_back_to_any_list_item() {
    let html = r"<ul><li>Excludes gift cards and previous purchases.</li></ul>";
    let terms = rules().extract(html, "u").terms;
    assert_eq!(terms, vec!["Excludes gift cards and previous purchases."]);
}

#[test]
fn extra_denylist_entries_apply() {
    let config = DetailConfig {
        extra_denylist: vec!["Shop Now".to_string()],
        ..DetailConfig::default()
    };
    let rules = CouponDetailRules::from_config("test", &config).unwrap();
    let html = r"<div class='terms'><li>Shop now and get rewarded on every order.</li></div>";
    assert!(rules.extract(html, "u").terms.is_empty());
}

#[test]
fn description_prefers_element_then_meta() {
    let html = r#"<head><meta name="description" content="Meta summary"></head>
        <body><p class="description">Take <b>10%</b> off</p></body>"#;
    assert_eq!(
        rules().extract(html, "u").description.as_deref(),
        Some("Take 10% off")
    );

    let meta_only = r#"<head><meta name="description" content=" Meta summary "></head>"#;
    assert_eq!(
        rules().extract(meta_only, "u").description.as_deref(),
        Some("Meta summary")
    );
}

#[test]
fn finds_expiry_text_in_body() {
    let html = r"<body><p>Hurry! Expires: March 31, 2026</p></body>";
    let expiry = rules().extract(html, "u").expiry_text.unwrap();
    assert!(expiry.starts_with("Expires"));
    assert!(expiry.contains("March 31"));
}

#[test]
fn empty_page_yields_empty_record() {
    assert!(rules().extract("<html></html>", "u").is_empty());
}

#[test]
fn invalid_configured_selector_is_rejected() {
    let config = DetailConfig {
        title_selector: Some("h1[".to_string()),
        ..DetailConfig::default()
    };
    assert!(matches!(
        CouponDetailRules::from_config("broken", &config),
        Err(ScraperError::InvalidSelector { .. })
    ));
}

#[test]
fn per_source_timings_are_exposed() {
    let config = DetailConfig {
        nav_timeout_secs: Some(12),
        settle_ms: Some(750),
        ..DetailConfig::default()
    };
    let rules = CouponDetailRules::from_config("test", &config).unwrap();
    assert_eq!(rules.nav_timeout(), Some(Duration::from_secs(12)));
    assert_eq!(rules.settle(), Some(Duration::from_millis(750)));
}
