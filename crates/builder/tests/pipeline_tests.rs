//! End-to-end pipeline runs with a recording toolchain.

mod common;

use common::{list, with_ext, zip_bytes, FakeToolchain, FakeTransport, TestEnv};
use norebo_builder::{build_all, build_image, BuildError, Manifest, ManifestEntry, Mode, Phase};
use std::path::PathBuf;

fn image_manifest() -> Manifest {
    Manifest::from_entries(vec![
        ManifestEntry::new("Kernel.Mod", "https://example.org/Kernel.Mod", Mode::Source),
        ManifestEntry::new("Files.Mod", "https://example.org/Files.Mod", Mode::Source),
        ManifestEntry::new("Notes.Text", "https://example.org/Notes.Text", Mode::Text),
    ])
}

#[test]
fn test_image_build_call_sequence() {
    let env = TestEnv::new();
    let sources = env.sources(&["Kernel.Mod", "Files.Mod", "Notes.Text"]);
    let toolchain = FakeToolchain::new();

    let image = build_image(&env.config, &image_manifest(), &sources, &toolchain).unwrap();

    let build = env.config.image_build_dir();
    let sources = sources.canonicalize().unwrap();
    let root = &env.config.root;
    let (norebo, compiler, oberon) = (build.join("norebo"), build.join("compiler"), build.join("oberon"));
    assert_eq!(image, build.join("Oberon.dsk"));

    let calls = toolchain.calls();
    let seen: Vec<(&str, &PathBuf, &[PathBuf])> = calls
        .iter()
        .map(|c| (c.command(), &c.cwd, c.search_path.as_slice()))
        .collect();
    assert_eq!(
        seen,
        [
            (
                "ORP.Compile",
                &norebo,
                &[root.join("Norebo"), root.join("Oberon"), root.join("Bootstrap")][..]
            ),
            (
                "CoreLinker.LinkSerial",
                &norebo,
                &[root.join("Norebo"), root.join("Bootstrap")][..]
            ),
            (
                "ORP.Compile",
                &compiler,
                &[sources.clone(), compiler.clone(), norebo.clone()][..]
            ),
            (
                "ORP.Compile",
                &oberon,
                &[sources.clone(), compiler.clone(), norebo.clone()][..]
            ),
            ("CoreLinker.LinkDisk", &build, &[oberon.clone(), norebo.clone()][..]),
            (
                "VDiskUtil.InstallFiles",
                &build,
                &[oberon.clone(), sources.clone(), norebo.clone()][..]
            ),
        ]
    );

    assert_eq!(calls[1].args, ["CoreLinker.LinkSerial", "Modules", "InnerCore"]);
    assert_eq!(calls[2].args, ["ORP.Compile", "ORS.Mod/s", "ORB.Mod/s", "ORG.Mod/s", "ORP.Mod/s"]);
    assert_eq!(calls[3].args, ["ORP.Compile", "Kernel.Mod/s", "Files.Mod/s"]);
    assert_eq!(calls[4].args, ["CoreLinker.LinkDisk", "Modules", "Oberon.dsk"]);
}

#[test]
fn test_image_build_leaves_expected_artifacts() {
    let env = TestEnv::new();
    let sources = env.sources(&["Kernel.Mod", "Files.Mod", "Notes.Text"]);
    let toolchain = FakeToolchain::new();

    build_image(&env.config, &image_manifest(), &sources, &toolchain).unwrap();

    let build = env.config.image_build_dir();
    assert_eq!(with_ext(&build, "dsk"), ["Oberon.dsk"]);

    let norebo = build.join("norebo");
    assert!(with_ext(&norebo, "smb").is_empty());
    assert!(with_ext(&norebo, "rsx").is_empty());
    assert_eq!(with_ext(&norebo, "rsc").len(), 18);
    assert!(norebo.join("InnerCore").is_file());

    let compiler = build.join("compiler");
    assert!(with_ext(&compiler, "smb").is_empty());
    assert_eq!(with_ext(&compiler, "rsc"), ["ORB.rsc", "ORG.rsc", "ORP.rsc", "ORS.rsc"]);

    let oberon = build.join("oberon");
    assert_eq!(with_ext(&oberon, "rsx"), ["Files.rsx", "Kernel.rsx"]);
    assert!(with_ext(&oberon, "rsc").is_empty());
    assert_eq!(with_ext(&oberon, "smb"), ["Files.smb", "Kernel.smb"]);

    // The sources directory is read, never written.
    assert_eq!(list(&sources), ["Files.Mod", "Kernel.Mod", "Notes.Text"]);
}

#[test]
fn test_image_build_install_order() {
    let env = TestEnv::new();
    let sources = env.sources(&["Kernel.Mod", "Files.Mod", "Notes.Text", ".hidden"]);
    let toolchain = FakeToolchain::new();

    build_image(&env.config, &image_manifest(), &sources, &toolchain).unwrap();

    let install = toolchain.calls().pop().unwrap();
    assert_eq!(
        install.args,
        [
            "VDiskUtil.InstallFiles",
            "Oberon.dsk",
            "Files.Mod=>Files.Mod",
            "Kernel.Mod=>Kernel.Mod",
            "Notes.Text=>Notes.Text",
            "Kernel.smb=>Kernel.smb",
            "Kernel.rsx=>Kernel.rsc",
            "Files.smb=>Files.smb",
            "Files.rsx=>Files.rsc",
        ]
    );
}

#[test]
fn test_compile_failure_stops_pipeline() {
    let env = TestEnv::new();
    let sources = env.sources(&["Kernel.Mod", "Files.Mod"]);
    let toolchain = FakeToolchain::failing(|call| call.cwd.ends_with("oberon"));

    let err = build_image(&env.config, &image_manifest(), &sources, &toolchain).unwrap_err();

    assert_eq!(err.phase(), Some(Phase::CompileTargets));
    assert!(!err.is_precondition());
    assert_eq!(
        toolchain.commands(),
        ["ORP.Compile", "CoreLinker.LinkSerial", "ORP.Compile", "ORP.Compile"]
    );
    assert!(!env.config.image_build_dir().join("Oberon.dsk").exists());
}

#[test]
fn test_missing_sources_directory() {
    let env = TestEnv::new();
    let toolchain = FakeToolchain::new();

    let err = build_image(&env.config, &image_manifest(), &env.path("nope"), &toolchain).unwrap_err();
    assert!(matches!(err, BuildError::NotFound(_)));

    let file = env.path("plain-file");
    std::fs::write(&file, b"").unwrap();
    let err = build_image(&env.config, &image_manifest(), &file, &toolchain).unwrap_err();
    assert!(matches!(err, BuildError::NotADirectory(_)));

    assert!(toolchain.calls().is_empty());
    assert!(!env.config.image_build_dir().exists());
}

#[test]
fn test_existing_build_directory() {
    let env = TestEnv::new();
    let sources = env.sources(&["Kernel.Mod"]);
    let build = env.config.image_build_dir();
    std::fs::create_dir(&build).unwrap();
    std::fs::write(build.join("keep"), b"old").unwrap();
    let toolchain = FakeToolchain::new();

    let err = build_image(&env.config, &image_manifest(), &sources, &toolchain).unwrap_err();

    assert!(matches!(err, BuildError::AlreadyExists(_)));
    assert!(err.is_precondition());
    assert!(toolchain.calls().is_empty());
    assert_eq!(list(&build), ["keep"]);
}

#[test]
fn test_build_all_existing_target_does_nothing() {
    let env = TestEnv::new();
    let target = env.path("out");
    std::fs::create_dir(&target).unwrap();
    let toolchain = FakeToolchain::new();
    let transport = FakeTransport::new();
    let mut manifest = image_manifest();

    let err = build_all(&env.config, &mut manifest, &target, &toolchain, &transport).unwrap_err();

    assert!(err.is_precondition());
    assert!(transport.requests().is_empty());
    assert!(toolchain.calls().is_empty());
    assert!(list(&target).is_empty());
}

#[test]
fn test_build_all_end_to_end() {
    let env = TestEnv::new();
    let target = env.path("out");
    let fonts = zip_bytes(&[
        ("Oberon10.Scn.Fnt", b"font"),
        ("doc/LICENSE.txt", b"license"),
        ("Oberon12.Scn.Fnt", b"font"),
    ]);
    let transport = FakeTransport::new()
        .with("https://example.org/Kernel.Mod", b"MODULE Kernel;\nEND Kernel.\n".to_vec())
        .with("https://example.org/System.Tool", b"System.Open\n".to_vec())
        .with("https://example.org/Fonts.zip", fonts);
    let mut manifest = Manifest::from_entries(vec![
        ManifestEntry::new("Kernel.Mod", "https://example.org/Kernel.Mod", Mode::Source),
        ManifestEntry::new("System.Tool", "https://example.org/System.Tool", Mode::Text),
        ManifestEntry::new("Fonts.zip", "https://example.org/Fonts.zip", Mode::Archive),
    ]);
    let toolchain = FakeToolchain::new();

    let image = build_all(&env.config, &mut manifest, &target, &toolchain, &transport).unwrap();

    assert_eq!(image, target.join("Oberon.dsk"));
    assert!(image.is_file());
    assert_eq!(
        list(&target.join("sources")),
        ["Kernel.Mod", "Oberon10.Scn.Fnt", "Oberon12.Scn.Fnt", "System.Tool"]
    );
    assert_eq!(
        std::fs::read(target.join("sources/Kernel.Mod")).unwrap(),
        b"MODULE Kernel;\rEND Kernel.\r"
    );

    let calls = toolchain.calls();
    assert_eq!(calls.len(), 6);
    assert_eq!(calls[2].search_path[0], target.join("sources"));
    assert_eq!(
        calls[5].args,
        [
            "VDiskUtil.InstallFiles",
            "Oberon.dsk",
            "Kernel.Mod=>Kernel.Mod",
            "Kernel.smb=>Kernel.smb",
            "Kernel.rsx=>Kernel.rsc",
            "System.Tool=>System.Tool",
            "Oberon10.Scn.Fnt=>Oberon10.Scn.Fnt",
            "Oberon12.Scn.Fnt=>Oberon12.Scn.Fnt",
        ]
    );
}

#[test]
fn test_build_all_fetch_failure_runs_no_toolchain() {
    let env = TestEnv::new();
    let target = env.path("out");
    let transport = FakeTransport::new();
    let toolchain = FakeToolchain::new();
    let mut manifest = image_manifest();

    let err = build_all(&env.config, &mut manifest, &target, &toolchain, &transport).unwrap_err();

    assert_eq!(err.phase(), Some(Phase::FetchSources));
    assert_eq!(transport.requests(), ["https://example.org/Kernel.Mod"]);
    assert!(toolchain.calls().is_empty());
}

#[cfg(unix)]
#[test]
fn test_image_build_installs_symlinked_sources() {
    let env = TestEnv::new();
    let sources = env.sources(&["Kernel.Mod", "Files.Mod"]);
    let shared = env.path("Notes.Text");
    std::fs::write(&shared, b"notes\r").unwrap();
    std::os::unix::fs::symlink(&shared, sources.join("Notes.Text")).unwrap();
    let toolchain = FakeToolchain::new();

    build_image(&env.config, &image_manifest(), &sources, &toolchain).unwrap();

    let install = toolchain.calls().pop().unwrap();
    assert!(install.args.iter().any(|a| a == "Notes.Text=>Notes.Text"));
}
