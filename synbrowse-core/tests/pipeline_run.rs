mod common;

use common::{dataset, gunzip, read_config, settings_in, FakeTools};
use std::fs;
use tempfile::TempDir;

use synbrowse_core::io::read_paf;
use synbrowse_core::pipeline::{
    prepare_annotation, prepare_sequence, register_annotation_track, setup_project, ArtifactPaths, Stages,
};
use synbrowse_core::{AlignmentFailurePolicy, Orchestrator, PipelineError, Strand};

#[test]
fn full_run_builds_browser_project() {
    let root = TempDir::new().unwrap();
    let settings = settings_in(root.path());
    let tools = FakeTools::new();

    let summary = Orchestrator::new(settings.clone(), &tools).run().expect("run");

    let out = &settings.output_dir;
    for file in [
        "sars_cov_2.fa.fai",
        "mers.fa.fai",
        "sars_genes.gff.gz.tbi",
        "mers_genes.gff.gz.tbi",
        "sars_mers.maf",
        "mers_sars.paf",
        "mers_db.prj",
    ] {
        assert!(out.join(file).exists(), "{file} missing");
    }

    // annotations were sorted by sequence then start before compression
    let gff = gunzip(&out.join("mers_genes.gff.gz"));
    let rows: Vec<&str> = gff.lines().collect();
    assert_eq!(rows[0], "##gff-version 3");
    assert!(rows[1].ends_with("ID=a"));

    let config = read_config(&settings);
    let assemblies: Vec<&str> = config["assemblies"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["name"].as_str().unwrap())
        .collect();
    assert_eq!(assemblies, vec!["sars_cov_2", "mers"]);

    let track_ids: Vec<&str> = config["tracks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["trackId"].as_str().unwrap())
        .collect();
    assert_eq!(
        track_ids,
        vec!["sars_genes.gff", "mers_genes.gff", "mers_vs_sars_cov_2-synteny"]
    );

    // locations end up relative to the project directory
    assert_eq!(
        config["assemblies"][1]["sequence"]["adapter"]["fastaLocation"]["uri"],
        "mers.fa"
    );
    assert_eq!(
        config["tracks"][1]["adapter"]["index"]["location"]["uri"],
        "mers_genes.gff.gz.tbi"
    );
    assert_eq!(config["tracks"][2]["adapter"]["pafLocation"]["uri"], "mers_sars.paf");
    assert_eq!(config["plugins"][0]["name"], "Protein3d");

    let alignment = summary.alignment.expect("alignment stats");
    assert_eq!(alignment.total_records, 2);
    assert_eq!(alignment.strand_reverse_count, 1);
    assert!(summary.text_indexed);
    assert_eq!(summary.stages.registered, 5);
    assert_eq!(summary.stages.invocations, tools.count());
}

#[test]
fn paf_output_follows_maf_pairs() {
    let root = TempDir::new().unwrap();
    let settings = settings_in(root.path());
    let tools = FakeTools::new();
    Orchestrator::new(settings.clone(), &tools).run().unwrap();

    let records = read_paf(settings.output_dir.join("mers_sars.paf")).unwrap();
    assert_eq!(
        records[0].to_string(),
        "NC_019843.3\t30119\t100\t110\t+\tNC_045512.2\t29903\t250\t260\t10\t10\t60"
    );
    assert_eq!(records[1].strand, Strand::Reverse);
    assert_eq!(records[1].target_start, 29903 - 20 - 4);
    assert_eq!(records[1].target_end, 29903 - 20);
}

#[test]
fn second_run_is_a_no_op() {
    let root = TempDir::new().unwrap();
    let settings = settings_in(root.path());
    let tools = FakeTools::new();
    Orchestrator::new(settings.clone(), &tools).run().unwrap();

    let config_before = fs::read(settings.output_dir.join("config.json")).unwrap();
    let calls_before = tools.count();

    let summary = Orchestrator::new(settings.clone(), &tools).run().unwrap();

    assert_eq!(tools.count(), calls_before, "{:?}", tools.invocations());
    assert_eq!(summary.stages.invocations, 0);
    assert_eq!(summary.stages.registered, 0);
    assert!(!summary.text_indexed);
    assert_eq!(fs::read(settings.output_dir.join("config.json")).unwrap(), config_before);
}

#[test]
fn resumes_from_decompressed_sequence() {
    let root = TempDir::new().unwrap();
    let settings = settings_in(root.path());
    fs::create_dir_all(&settings.output_dir).unwrap();
    fs::write(settings.output_dir.join("mers.fa"), ">NC_019843.3\nACGT\n").unwrap();

    let tools = FakeTools::new();
    Orchestrator::new(settings.clone(), &tools).run().unwrap();

    let mers = dataset(&settings, "mers");
    assert!(tools.matching(&mers.genome_url).is_empty());
    assert_eq!(tools.matching("faidx").len(), 2);
    // the directory already existed, so the project was not recreated
    assert!(tools.matching("jbrowse create").is_empty());
    assert!(settings.output_dir.join("config.json").exists());
}

#[test]
fn genome_download_is_not_content_checked() {
    let root = TempDir::new().unwrap();
    let settings = settings_in(root.path());
    let out = settings.output_dir.clone();
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("mers.fa.gz"), common::gzip(b"\n>NC_019843.3\nACGT\n")).unwrap();

    let tools = FakeTools::new();
    let mut stages = Stages::new(&tools, &settings.tools, &out);
    let paths = prepare_sequence(&mut stages, dataset(&settings, "mers")).expect("leading blank line is accepted");

    let calls: Vec<String> = tools.invocations().iter().map(|i| i.program.clone()).collect();
    assert_eq!(calls, vec!["gunzip", "samtools"]);
    assert!(paths.index.exists());
}

#[test]
fn sort_failure_is_fatal() {
    let root = TempDir::new().unwrap();
    let settings = settings_in(root.path());
    let tools = FakeTools::new().fail("sort", 1);

    let err = Orchestrator::new(settings.clone(), &tools).run().unwrap_err();

    assert!(matches!(err, PipelineError::SortFailed { .. }), "{err}");
    let paths = ArtifactPaths::annotation(&settings.output_dir, &dataset(&settings, "sars_cov_2").annotation_file);
    // left decompressed and unsorted, nothing compressed
    assert_eq!(fs::read_to_string(&paths.source).unwrap(), common::GFF_BODY);
    assert!(!paths.compressed.exists());
    assert!(!paths.sorted().exists());
    assert!(tools.matching("bgzip").is_empty());
}

#[test]
fn resumes_annotation_from_compressed_state() {
    let root = TempDir::new().unwrap();
    let settings = settings_in(root.path());
    let out = settings.output_dir.clone();
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("mers_genes.gff"), common::GFF_BODY).unwrap();
    fs::write(out.join("mers_genes.gff.gz"), common::gzip(common::GFF_BODY.as_bytes())).unwrap();

    let tools = FakeTools::new();
    let mut stages = Stages::new(&tools, &settings.tools, &out);
    prepare_annotation(&mut stages, dataset(&settings, "mers")).unwrap();

    let calls: Vec<String> = tools.invocations().iter().map(|i| i.program.clone()).collect();
    assert_eq!(calls, vec!["tabix"]);
}

#[test]
fn track_registration_retries_once() {
    let root = TempDir::new().unwrap();
    let settings = settings_in(root.path());
    let tools = FakeTools::new().fail("jbrowse add-track", 1);

    Orchestrator::new(settings.clone(), &tools).run().expect("retry recovers");

    let sars_tracks = tools.matching("add-track");
    assert_eq!(sars_tracks.len(), 3, "{sars_tracks:?}");
    // initial compress for each annotation plus one recompress for the retry
    assert_eq!(tools.matching("bgzip").len(), 3);
    assert_eq!(read_config(&settings)["tracks"].as_array().unwrap().len(), 3);
}

#[test]
fn track_registration_fails_after_second_attempt() {
    let root = TempDir::new().unwrap();
    let settings = settings_in(root.path());
    let tools = FakeTools::new().fail("jbrowse add-track", 2);

    let err = Orchestrator::new(settings.clone(), &tools).run().unwrap_err();

    assert!(matches!(err, PipelineError::TrackRegistration { ref assembly, .. } if assembly == "sars_cov_2"));
    assert_eq!(tools.matching("add-track").len(), 2);
    // mers was never reached
    assert!(tools.matching("mers.fa").is_empty());
}

#[test]
fn track_registration_is_not_retried_when_cli_cannot_start() {
    let root = TempDir::new().unwrap();
    let settings = settings_in(root.path());
    let tools = FakeTools::new().unstartable("jbrowse add-track");

    let err = Orchestrator::new(settings.clone(), &tools).run().unwrap_err();

    assert!(matches!(err, PipelineError::TrackRegistration { ref assembly, .. } if assembly == "sars_cov_2"));
    assert_eq!(tools.matching("add-track").len(), 1);
    assert_eq!(tools.matching("bgzip").len(), 1);
}

#[test]
fn missing_archive_is_rebuilt_before_registration() {
    let root = TempDir::new().unwrap();
    let settings = settings_in(root.path());
    let out = settings.output_dir.clone();
    let tools = FakeTools::new();
    let mut stages = Stages::new(&tools, &settings.tools, &out);
    let config = setup_project(&mut stages).unwrap();

    let mers = dataset(&settings, "mers");
    config
        .edit(|doc| {
            doc.ensure_assembly("mers", &out.join("mers.fa"), &out.join("mers.fa.fai"));
            Ok(())
        })
        .unwrap();
    fs::write(out.join("mers_genes.gff"), common::GFF_BODY).unwrap();

    let paths = ArtifactPaths::annotation(&out, &mers.annotation_file);
    assert!(register_annotation_track(&mut stages, &config, "mers", &paths).unwrap());
    assert!(paths.compressed.exists());
    assert!(paths.index.exists());

    // neither file left: nothing to rebuild from
    let lost = ArtifactPaths::annotation(&out, "lost.gff");
    let err = register_annotation_track(&mut stages, &config, "mers", &lost).unwrap_err();
    assert!(matches!(err, PipelineError::TrackRegistration { .. }));
}

#[test]
fn invalid_annotation_download_is_fatal() {
    let root = TempDir::new().unwrap();
    let settings = settings_in(root.path());
    let sars = dataset(&settings, "sars_cov_2").clone();
    let tools = FakeTools::new().broken_url(&sars.annotation_url);

    let err = Orchestrator::new(settings.clone(), &tools).run().unwrap_err();

    assert!(matches!(err, PipelineError::ValidationFailed { format: "GFF3", .. }));
    assert!(tools.matching("sars_genes.gff.gz").iter().all(|c| !c.starts_with("gunzip")));
    assert!(tools.matching("bgzip").is_empty());
}

#[test]
fn failed_download_leaves_no_artifact() {
    let root = TempDir::new().unwrap();
    let settings = settings_in(root.path());
    let tools = FakeTools::new().fail("wget", 1);

    let err = Orchestrator::new(settings.clone(), &tools).run().unwrap_err();

    assert!(matches!(err, PipelineError::DownloadFailed { .. }));
    assert_eq!(err.tool(), Some("wget"));
    assert!(!settings.output_dir.join("sars_cov_2.fa.gz").exists());
}

#[test]
fn alignment_failure_policy() {
    let root = TempDir::new().unwrap();
    let settings = settings_in(root.path());
    let tools = FakeTools::new().fail("lastal", 1);
    let err = Orchestrator::new(settings, &tools).run().unwrap_err();
    assert_eq!(err.tool(), Some("lastal"));

    let root = TempDir::new().unwrap();
    let mut settings = settings_in(root.path());
    settings.alignment.on_error = AlignmentFailurePolicy::Warn;
    let tools = FakeTools::new().fail("lastal", 1);
    let summary = Orchestrator::new(settings.clone(), &tools).run().unwrap();

    assert!(summary.alignment.is_none());
    let config = read_config(&settings);
    assert!(config["tracks"]
        .as_array()
        .unwrap()
        .iter()
        .all(|t| t["type"] != "SyntenyTrack"));
    assert_eq!(config["plugins"][0]["name"], "Protein3d");
}

#[test]
fn extra_lastal_args_are_appended() {
    let root = TempDir::new().unwrap();
    let mut settings = settings_in(root.path());
    settings.alignment.lastal_args = vec!["-Q0".to_string()];
    let tools = FakeTools::new();

    Orchestrator::new(settings, &tools).run().unwrap();

    assert_eq!(tools.matching("lastal -m100 -E0.05 -P4 -Q0 ").len(), 1);
}

#[test]
fn missing_tool_stops_run() {
    let root = TempDir::new().unwrap();
    let settings = settings_in(root.path());
    let tools = FakeTools::new().without("tabix");

    let err = Orchestrator::new(settings, &tools).run().unwrap_err();

    assert!(matches!(err, PipelineError::ToolMissing(ref t) if t == "tabix"));
    assert_eq!(tools.count(), 0);
}

#[test]
fn gene_span_track_is_added_when_fasta_present() {
    let root = TempDir::new().unwrap();
    let settings = settings_in(root.path());
    fs::create_dir_all(&settings.output_dir).unwrap();
    fs::write(
        settings.output_dir.join("mers.cds"),
        ">ORF1ab|NC_019843.3\nACGTACGT\nACG\n>S|NC_019843.3\nACGTAC\n",
    )
    .unwrap();

    let tools = FakeTools::new();
    Orchestrator::new(settings.clone(), &tools).run().unwrap();

    let gff = gunzip(&settings.output_dir.join("mers_cds.gff.gz"));
    assert!(gff.contains("ORF1ab\t.\tgene\t1\t11\t.\t+\t.\tID=ORF1ab"));
    assert!(gff.contains("S\t.\tgene\t1\t6\t.\t+\t.\tID=S"));

    let config = read_config(&settings);
    let cds_track = config["tracks"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["trackId"] == "mers_cds.gff")
        .expect("gene span track");
    assert_eq!(cds_track["assemblyNames"][0], "mers");
}

#[test]
fn curl_downloader() {
    let root = TempDir::new().unwrap();
    let mut settings = settings_in(root.path());
    settings.tools.downloader = synbrowse_core::Downloader::Curl;
    settings.alignment.enabled = false;
    let tools = FakeTools::new().without("wget");

    let summary = Orchestrator::new(settings.clone(), &tools).run().unwrap();

    assert_eq!(tools.matching("curl -fsSL").len(), 4);
    assert!(summary.alignment.is_none());
    assert!(tools.matching("lastal").is_empty());
}
