use super::*;
use hca_common::{LinkageMethod, Metric, StructureFilter};

#[test]
fn test_defaults_reproduce_comprehensive_run() {
    let config = Config::default();
    let jobs = config.resolve_jobs();
    let outputs: Vec<String> = jobs.iter().map(|j| j.output.display().to_string()).collect();
    assert_eq!(
        outputs,
        vec![
            "hotspots_01_HO_dendrogram.png",
            "hotspots_02_Jaccard_dendrogram.png",
            "hotspots_03_Overlap_dendrogram.png",
            "hotspots_04_Euclidean_HCA.png",
        ]
    );
    assert_eq!(config.alignment_mode(), AlignmentMode::Global);
    assert_eq!(config.selection.threshold().to_string(), "S0 > 20");
    assert!(config.validate().is_ok());
}

#[test]
fn test_standard_job_parameters() {
    let jobs = Preset::All.jobs();
    assert_eq!(jobs[0].params.radius, Some(1.5));
    assert_eq!(jobs[1].params.radius, Some(5.0));
    assert_eq!(jobs[2].params.radius, Some(5.0));
    assert!(!jobs[0].requires_pre_alignment);
    assert!(jobs[1..3].iter().all(|j| j.requires_pre_alignment));

    let euclid = &jobs[3];
    assert!(!euclid.requires_pre_alignment);
    assert!(euclid.params.normalize);
    assert_eq!(euclid.params.linkage, Some(LinkageMethod::Ward));
    assert_eq!(euclid.title(), "Euclidean HCA (S0 + CD + MD)");
    assert_eq!(euclid.selection_prefixes.as_deref(), Some(&["K15_".to_string()][..]));
}

#[test]
fn test_single_metric_presets() {
    let config = Config {
        output: OutputConfig {
            prefix: "3B24_B_S0_20".to_string(),
            preset: Preset::Jaccard,
            ..Default::default()
        },
        ..Default::default()
    };
    let jobs = config.resolve_jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].metric, Metric::Jaccard);
    assert_eq!(jobs[0].output, PathBuf::from("3B24_B_S0_20_Jaccard.png"));
    assert_eq!(config.alignment_mode(), AlignmentMode::PerJob);
    assert_eq!(Preset::Euclidean.default_alignment_mode(), AlignmentMode::Disabled);
}

#[test]
fn test_parse_full_toml() {
    let content = r#"
        [input]
        pattern = "$FTMAP_DIR/*.pdb"

        [selection]
        cutoff = 17.5
        name_prefixes = ["B"]

        [alignment]
        mode = "skip"
        reference = { policy = "first_matching", filter = { name_contains = "3B24" } }
        exclude_failed = true

        [output]
        prefix = "run"
        dpi = 150

        [[jobs]]
        name = "HO"
        metric = "ho"
        requires_pre_alignment = true
        radius = 2
        output = "{prefix}_ho.png"

        [[jobs]]
        name = "Euclid"
        metric = "euclidean"
        properties = ["S0", "CD"]
        normalize = true
        linkage = "average"
        output = "out/{prefix}_euclid.png"
    "#;
    let config = Config::from_toml(content).unwrap();
    assert_eq!(config.input.pattern, "$FTMAP_DIR/*.pdb");
    assert_eq!(config.selection.cutoff, 17.5);
    assert_eq!(config.selection.descriptor, "S0");
    assert_eq!(config.alignment_mode(), AlignmentMode::Disabled);
    assert_eq!(
        config.alignment.reference,
        ReferencePolicy::FirstMatching(StructureFilter::NameContains("3B24".to_string()))
    );
    assert!(config.alignment.exclude_failed);

    let jobs = config.resolve_jobs();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].params.radius, Some(2.0));
    assert!(jobs[0].params.annotate);
    assert_eq!(jobs[1].output, PathBuf::from("out/run_euclid.png"));
    assert_eq!(jobs[1].params.linkage, Some(LinkageMethod::Average));
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_rejects_duplicate_outputs() {
    let mut config = Config::default();
    config.jobs = vec![
        AnalysisJob::new("a", Metric::Ho, "{prefix}.png").with_params(hca_common::JobParams::pairwise(1.5)),
        AnalysisJob::new("b", Metric::Jaccard, "{prefix}.png").with_params(hca_common::JobParams::pairwise(5.0)),
    ];
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("share the output path"));
}

#[test]
fn test_validate_rejects_pairwise_job_without_radius() {
    let mut config = Config::default();
    config.jobs = vec![AnalysisJob::new("a", Metric::Overlap, "{prefix}.png")];
    assert!(config.validate().is_err());
}

#[test]
fn test_load_from_missing_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load_from(dir.path().join("nope.toml")).unwrap_err();
    assert_eq!(err.exit_code(), 64);
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hca.toml");
    std::fs::write(&path, "[output]\npreset = \"ho\"\nprefix = \"x\"\n").unwrap();
    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.output.preset, Preset::Ho);
    assert_eq!(config.resolve_jobs()[0].output, PathBuf::from("x_HO.png"));
}

#[test]
fn test_mode_and_preset_parse_from_cli_strings() {
    assert_eq!("per-job".parse::<AlignmentMode>().unwrap(), AlignmentMode::PerJob);
    assert_eq!("per_job".parse::<AlignmentMode>().unwrap(), AlignmentMode::PerJob);
    assert_eq!("skip".parse::<AlignmentMode>().unwrap(), AlignmentMode::Disabled);
    assert_eq!("comprehensive".parse::<Preset>().unwrap(), Preset::All);
    assert!("tanimoto".parse::<Preset>().is_err());
}

#[test]
fn test_example_config_matches_defaults() {
    let config = Config::from_toml(include_str!("../../../hca.example.toml")).unwrap();
    let defaults = Config::default();
    assert_eq!(config.input.pattern, defaults.input.pattern);
    assert_eq!(config.selection.name_prefixes, defaults.selection.name_prefixes);
    assert_eq!(config.alignment.reference, defaults.alignment.reference);
    assert_eq!(config.output.dpi, 300);
    assert_eq!(config.resolve_jobs(), defaults.resolve_jobs());
}
