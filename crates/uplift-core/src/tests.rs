use std::path::PathBuf;

use super::report::{
    extract_patch_failures, parse_short_status, parse_unmerged_paths, reports_patch_failures,
    FileStatus,
};
use super::*;

#[test]
fn version_parses_four_components() {
    let version = Version::parse("131.0.6778.33").expect("version should parse");
    assert_eq!(version, Version::new(131, 0, 6778, 33));
    assert_eq!(version.to_string(), "131.0.6778.33");
}

#[test]
fn version_parse_rejects_wrong_component_count() {
    for input in ["131.0.6778", "131.0.6778.33.1", "", "131"] {
        let err = Version::parse(input).expect_err("must reject malformed version");
        assert_eq!(err.code(), "malformed-version", "input: {input}");
    }
}

#[test]
fn version_parse_rejects_non_numeric_and_signed_components() {
    for input in ["131.0.x.33", "131.-1.0.0", "131..0.0", "131.0.0.+1", "1 31.0.0.0"] {
        assert!(Version::parse(input).is_err(), "input: {input}");
    }
}

#[test]
fn is_upgrade_uses_first_differing_component() {
    assert!(is_upgrade("131.0.0.0", "130.0.0.0"));
    assert!(is_upgrade("130.0.6723.59", "130.0.6723.58"));
    assert!(is_upgrade("130.1.0.0", "130.0.9999.9999"));
    assert!(!is_upgrade("130.0.0.0", "131.0.0.0"));
    assert!(!is_upgrade("130.0.6723.58", "130.0.6723.59"));
    assert!(!is_upgrade("129.9.9999.9999", "130.0.0.0"));
}

#[test]
fn is_upgrade_is_false_for_equal_versions() {
    assert!(!is_upgrade("131.0.6778.33", "131.0.6778.33"));
}

#[test]
fn is_upgrade_is_false_for_malformed_input() {
    assert!(!is_upgrade("131.0.6778", "130.0.0.0"));
    assert!(!is_upgrade("131.0.0.0", "130.0"));
    assert!(!is_upgrade("latest", "130.0.0.0"));
    assert!(!is_upgrade("131.0.0.0", ""));
}

#[test]
fn version_ordering_matches_is_upgrade() {
    let older = Version::new(130, 0, 6723, 91);
    let newer = Version::new(130, 0, 6723, 100);
    assert!(newer > older);
    assert!(newer.is_upgrade_from(&older));
    assert!(!older.is_upgrade_from(&newer));
}

#[test]
fn is_major_upgrade_compares_first_component_only() {
    assert!(is_major_upgrade("131.0.0.0", "130.9.9999.9999"));
    assert!(!is_major_upgrade("130.1.0.0", "130.0.0.0"));
    assert!(!is_major_upgrade("129.0.0.0", "130.0.0.0"));
    assert!(!is_major_upgrade("131", "130.0.0.0"));
}

#[test]
fn version_serializes_as_dotted_string() {
    let version = Version::new(131, 0, 6778, 33);
    let json = serde_json::to_string(&version).expect("must serialize");
    assert_eq!(json, "\"131.0.6778.33\"");
    let parsed: Version = serde_json::from_str(&json).expect("must deserialize");
    assert_eq!(parsed, version);

    let err = serde_json::from_str::<Version>("\"131.0\"").expect_err("must reject");
    assert!(err.to_string().contains("malformed-version"));
}

#[test]
fn classify_with_only_removed_sources_yields_no_groups() {
    let failures = vec![
        PatchFailure::source_removed("patches/chrome-browser-a.patch"),
        PatchFailure::source_removed("patches/v8/src-b.patch"),
        PatchFailure::source_removed("patches/c.patch"),
    ];

    let classified = classify_failures(&failures, "patches").expect("must classify");
    assert!(classified.groups.is_empty());
    assert_eq!(
        classified.removed_source_patches,
        vec![
            "patches/chrome-browser-a.patch",
            "patches/v8/src-b.patch",
            "patches/c.patch"
        ]
    );
}

#[test]
fn classify_groups_by_sub_repository() {
    let failures = vec![
        PatchFailure::conflict("a/patches/sub1/x.patch"),
        PatchFailure::conflict("a/patches/x.patch"),
    ];

    let classified = classify_failures(&failures, "patches").expect("must classify");
    let groups = classified.groups.iter().collect::<Vec<_>>();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].repo, "sub1");
    assert_eq!(groups[0].patches, vec!["a/patches/sub1/x.patch"]);
    assert_eq!(groups[1].repo, "");
    assert_eq!(groups[1].patches, vec!["a/patches/x.patch"]);
    assert!(classified.removed_source_patches.is_empty());
}

#[test]
fn classify_preserves_first_seen_order_within_and_across_groups() {
    let failures = vec![
        PatchFailure::conflict("patches/ui/views/one.patch"),
        PatchFailure::conflict("patches/base.patch"),
        PatchFailure::source_removed("patches/ui/views/gone.patch"),
        PatchFailure::conflict("patches/ui/views/two.patch"),
        PatchFailure::conflict("patches/v8/three.patch"),
    ];

    let classified = classify_failures(&failures, "patches").expect("must classify");
    let order = classified
        .groups
        .iter()
        .map(|group| group.repo.as_str())
        .collect::<Vec<_>>();
    assert_eq!(order, vec!["ui/views", "", "v8"]);
    assert_eq!(
        classified.groups.get("ui/views"),
        Some(
            &[
                "patches/ui/views/one.patch".to_string(),
                "patches/ui/views/two.patch".to_string()
            ][..]
        )
    );
    assert_eq!(
        classified.removed_source_patches,
        vec!["patches/ui/views/gone.patch"]
    );
}

#[test]
fn classify_rejects_path_without_marker() {
    let failures = vec![PatchFailure::conflict("chromium_src/foo/bar.patch")];
    let err = classify_failures(&failures, "patches").expect_err("must reject");
    assert_eq!(err.code(), "malformed-patch-path");
    assert!(err.to_string().contains("chromium_src/foo/bar.patch"));
}

#[test]
fn classify_ignores_marker_check_for_removed_sources() {
    let failures = vec![PatchFailure::source_removed("elsewhere/x.patch")];
    let classified = classify_failures(&failures, "patches").expect("must classify");
    assert_eq!(classified.removed_source_patches, vec!["elsewhere/x.patch"]);
}

#[test]
fn sub_repository_of_uses_first_marker_segment() {
    assert_eq!(
        sub_repository_of("patches/third_party/patches/x.patch", "patches").expect("must parse"),
        "third_party/patches"
    );
    assert_eq!(
        sub_repository_of("./patches/x.patch", "patches").expect("must parse"),
        ""
    );
    assert_eq!(sub_repository_of("patches", "patches").expect("must parse"), "");
}

#[test]
fn tool_reason_maps_to_failure_reason() {
    assert_eq!(
        PatchFailureReason::from_tool_reason(Some("SRC_REMOVED")),
        PatchFailureReason::SourceRemoved
    );
    assert_eq!(
        PatchFailureReason::from_tool_reason(Some("SOURCE_REMOVED")),
        PatchFailureReason::SourceRemoved
    );
    assert_eq!(
        PatchFailureReason::from_tool_reason(Some("PATCH_FAILED")),
        PatchFailureReason::Conflict
    );
    assert_eq!(
        PatchFailureReason::from_tool_reason(None),
        PatchFailureReason::Conflict
    );
}

#[test]
fn patch_groups_round_trip_keeps_insertion_order() {
    let mut groups = PatchGroups::new();
    groups.push("v8", "patches/v8/a.patch");
    groups.push("", "patches/b.patch");
    groups.push("v8", "patches/v8/c.patch");

    let json = serde_json::to_string(&groups).expect("must serialize");
    assert_eq!(
        json,
        r#"{"v8":["patches/v8/a.patch","patches/v8/c.patch"],"":["patches/b.patch"]}"#
    );

    let parsed: PatchGroups = serde_json::from_str(&json).expect("must deserialize");
    assert_eq!(parsed, groups);
    assert_eq!(
        parsed.all_patches().collect::<Vec<_>>(),
        vec!["patches/v8/a.patch", "patches/v8/c.patch", "patches/b.patch"]
    );
}

#[test]
fn patch_groups_reject_duplicate_keys() {
    let err = serde_json::from_str::<PatchGroups>(r#"{"v8":["a"],"v8":["b"]}"#)
        .expect_err("must reject duplicate key");
    assert!(err.to_string().contains("duplicate sub-repository 'v8'"));
}

#[test]
fn reports_patch_failures_checks_last_non_empty_line() {
    let stderr = "Applying patches\nsome noise\nExiting as not all patches were successful!\n\n";
    assert!(reports_patch_failures(stderr));

    let earlier = "Exiting as not all patches were successful!\nnpm ERR! code 1\n";
    assert!(!reports_patch_failures(earlier));
    assert!(!reports_patch_failures(""));
}

#[test]
fn extract_patch_failures_finds_embedded_array() {
    let stdout = r#"> brave-core@1.0.0 apply_patches
> node ./build/commands/scripts/applyPatches.js --print-patch-failures-in-json

[
  {
    "patchPath": "patches/chrome-browser-ui-foo.patch",
    "reason": "PATCH_FAILED"
  },
  {
    "patchPath": "patches/v8/src-bar.patch",
    "reason": "SRC_REMOVED"
  }
]
done
"#;

    let failures = extract_patch_failures(stdout)
        .expect("must parse")
        .expect("must find array");
    assert_eq!(
        failures,
        vec![
            PatchFailure::conflict("patches/chrome-browser-ui-foo.patch"),
            PatchFailure::source_removed("patches/v8/src-bar.patch"),
        ]
    );
}

#[test]
fn extract_patch_failures_returns_none_without_array() {
    assert_eq!(
        extract_patch_failures("all patches applied\n[info] done").expect("must parse"),
        None
    );
    assert_eq!(extract_patch_failures("[]").expect("must parse"), None);
}

#[test]
fn extract_patch_failures_rejects_malformed_records() {
    let err = extract_patch_failures(r#"[ {"path": "patches/x.patch"} ]"#)
        .expect_err("must reject record without patchPath");
    assert!(err.to_string().contains("patch-report-invalid"));
}

#[test]
fn parse_unmerged_paths_reads_only_prefixed_lines() {
    let stderr = "error: patch failed: chrome/browser/foo.cc:12\n\
Falling back to three-way merge...\n\
U chrome/browser/foo.cc\n\
Applied patch to 'chrome/browser/bar.cc' cleanly.\n\
U Uppercase/starts_with_u.cc\n\
U \n";
    assert_eq!(
        parse_unmerged_paths(stderr),
        vec!["chrome/browser/foo.cc", "Uppercase/starts_with_u.cc"]
    );
}

#[test]
fn parse_short_status_classifies_entries() {
    let output = " M package.json\n D patches/old.patch\n?? patches/new.patch\nMM app/foo.grd\nR  a -> b\n";
    let entries = parse_short_status(output);
    let summary = entries
        .iter()
        .map(|entry| (entry.status, entry.path.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(
        summary,
        vec![
            (FileStatus::Modified, "package.json"),
            (FileStatus::Deleted, "patches/old.patch"),
            (FileStatus::Untracked, "patches/new.patch"),
            (FileStatus::Modified, "app/foo.grd"),
            (FileStatus::Other, "a -> b"),
        ]
    );
}

#[test]
fn config_defaults_apply_for_empty_file() {
    let config = UpliftConfig::from_toml_str("").expect("empty config must parse");
    assert_eq!(config, UpliftConfig::default());
    assert_eq!(config.product, "Chromium");
    assert_eq!(config.continuation_file, ".version_upgrade");
}

#[test]
fn config_overrides_selected_keys() {
    let config = UpliftConfig::from_toml_str(
        r#"
product = "Upstream"
downstream = "Fork"
string_globs = ["*.xtb"]

[github]
repo = "example/downstream"
labels = []
"#,
    )
    .expect("config must parse");
    assert_eq!(config.product, "Upstream");
    assert_eq!(config.downstream, "Fork");
    assert_eq!(config.string_globs, vec!["*.xtb"]);
    assert_eq!(config.github.repo, "example/downstream");
    assert!(config.github.labels.is_empty());
    assert_eq!(config.github.assignees, GithubConfig::default().assignees);
}

#[test]
fn config_rejects_unknown_keys() {
    let err = UpliftConfig::from_toml_str("prodcut = \"typo\"\n").expect_err("must reject");
    assert!(format!("{err:#}").contains("unknown field"));
}

#[test]
fn config_rejects_invalid_values() {
    let err = UpliftConfig::from_toml_str("patches_marker = \"a/b\"\n").expect_err("must reject");
    assert!(err.to_string().contains("patches_marker"));

    let err =
        UpliftConfig::from_toml_str("version_pointer = \"config.tag\"\n").expect_err("must reject");
    assert!(err.to_string().contains("version_pointer"));

    let err = UpliftConfig::from_toml_str("[github]\nhistory_link = \"https://example.test\"\n")
        .expect_err("must reject");
    assert!(err.to_string().contains("history_link"));
}

#[test]
fn history_link_substitutes_versions() {
    let config = UpliftConfig::default();
    assert_eq!(
        config.history_link("130.0.6723.58", "131.0.6778.33"),
        "https://chromium.googlesource.com/chromium/src/+log/130.0.6723.58..131.0.6778.33?pretty=fuller&n=10000"
    );
}

#[test]
fn layout_resolves_sub_repositories_under_source_root() {
    let layout = RepoLayout::new("/work/src/brave", &UpliftConfig::default());
    assert_eq!(
        layout.sub_repository_path(""),
        PathBuf::from("/work/src/brave/..")
    );
    assert_eq!(
        layout.sub_repository_path("third_party/search_engines_data/resources"),
        PathBuf::from("/work/src/brave/../third_party/search_engines_data/resources")
    );
    assert_eq!(layout.sub_repository_display("", "chrome/a.cc"), "../chrome/a.cc");
    assert_eq!(layout.sub_repository_display("v8", "src/b.cc"), "../v8/src/b.cc");
    assert_eq!(
        layout.continuation_path(),
        PathBuf::from("/work/src/brave/.version_upgrade")
    );
}

#[test]
fn error_codes_and_halt_classification() {
    let dirty = UpgradeError::DirtyPatchState {
        deleted: vec!["patches/a.patch".to_string()],
        untracked: Vec::new(),
    };
    assert_eq!(dirty.code(), "dirty-patch-state");
    assert!(dirty.is_expected_halt());
    assert!(dirty.to_string().contains("patches/a.patch"));

    let tool = UpgradeError::tool_failure("npm run init", Some(1), "boom");
    assert_eq!(tool.code(), "tool-failure");
    assert!(!tool.is_expected_halt());
    assert_eq!(
        tool.to_string(),
        "tool-failure: npm run init failed (exit status 1)\nboom"
    );
}

#[test]
fn typed_errors_survive_anyhow_round_trip() {
    let wrapped = anyhow::Error::new(UpgradeError::NothingToCommit);
    let recovered = UpgradeError::from(wrapped);
    assert_eq!(recovered.code(), "nothing-to-commit");

    let plain = UpgradeError::from(anyhow::anyhow!("disk full"));
    assert_eq!(plain.code(), "internal");
    assert_eq!(plain.to_string(), "disk full");
}
