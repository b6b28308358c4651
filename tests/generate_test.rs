use std::fs;
use std::path::{Path, PathBuf};

use fisco_k8s::generator::{CONFIG_MAP_FILE, SERVICE_FILE, STATEFUL_SET_FILE};
use fisco_k8s::ini::IniDocument;
use fisco_k8s::manifest::{ConfigMap, Service, StatefulSet};
use fisco_k8s::{FailurePolicy, GenError, Generator, GeneratorConfig, ImagePullPolicy};
use tempfile::TempDir;

const PEERS: [&str; 3] = ["1.2.3.4:30300", "1.2.3.5:30300", "1.2.3.6:30300"];

fn config_ini(index: usize) -> String {
    format!(
        "\
[p2p]
    ; ssl or sm ssl
    sm_ssl=false
    listen_ip=0.0.0.0
    listen_port={p2p}
    nodes_path=./
    nodes_file=nodes.json

[rpc]
    listen_ip=0.0.0.0
    listen_port={rpc}
    thread_count=4

[cert]
    ; directory the certificates located in
    ca_path=./conf

[security]
    private_key_path=conf/node.pem

[storage]
    data_path=data
    enable_cache=true

[log]
    enable=true
    log_path=./log
    level=info
",
        p2p = 30300 + index,
        rpc = 20200 + index,
    )
}

struct Fixture {
    _dir: TempDir,
    nodes_dir: PathBuf,
    work_dir: PathBuf,
}

impl Fixture {
    fn new(node_count: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let nodes_dir = dir.path().join("fisco/nodes/127.0.0.1");
        let work_dir = dir.path().join("out");
        fs::create_dir_all(&nodes_dir).unwrap();

        for i in 0..node_count {
            let node = nodes_dir.join(format!("node{}", i));
            fs::create_dir_all(node.join("conf")).unwrap();
            fs::write(node.join("config.ini"), config_ini(i)).unwrap();
            fs::write(node.join("config.genesis"), "[chain]\n    group_id=group0\n").unwrap();
            fs::write(node.join("nodes.json"), format!(r#"{{"nodes":{:?}}}"#, PEERS)).unwrap();
            fs::write(node.join("conf/ca.crt"), "-----BEGIN CERTIFICATE-----\n").unwrap();
            fs::write(node.join("conf/node.pem"), format!("key-{}\n", i)).unwrap();
            fs::write(node.join("conf/node.nodeid"), format!("nodeid-{}\n", i)).unwrap();
        }
        // helper scripts from the chain builder sit next to the node dirs
        fs::write(nodes_dir.join("start_all.sh"), "#!/bin/bash\n").unwrap();

        Self {
            _dir: dir,
            nodes_dir,
            work_dir,
        }
    }

    fn node(&self, i: usize) -> PathBuf {
        self.nodes_dir.join(format!("node{}", i))
    }

    fn config(&self, chain_name: &str) -> GeneratorConfig {
        GeneratorConfig {
            work_dir: self.work_dir.clone(),
            chain_name: chain_name.to_string(),
            nodes_dir: self.nodes_dir.clone(),
            ..Default::default()
        }
    }

    fn output(&self, chain_name: &str, node: &str) -> PathBuf {
        self.work_dir.join(chain_name).join(node)
    }
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> T {
    serde_yaml::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    names
}

#[test_log::test]
fn three_node_chain_end_to_end() {
    let fixture = Fixture::new(3);
    let generator = Generator::new(fixture.config("mychain")).unwrap();

    let report = generator.run(FailurePolicy::Abort).unwrap();
    assert!(report.is_success());
    let names: Vec<_> = report.generated.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["node0", "node1", "node2"]);

    let out = fixture.output("mychain", "node1");
    assert_eq!(
        fs::read_to_string(out.join("conf/nodes.json")).unwrap(),
        r#"{"nodes": ["mychain-node0:30300", "mychain-node2:30300"]}"#
    );

    let service: Service = read_yaml(&out.join(SERVICE_FILE));
    assert_eq!(service.metadata.name, "mychain-node1");

    let sts: StatefulSet = read_yaml(&out.join(STATEFUL_SET_FILE));
    assert_eq!(sts.metadata.name, "mychain-node1");
}

#[test]
fn resource_names_follow_chain_and_node() {
    let fixture = Fixture::new(2);
    Generator::new(fixture.config("prod"))
        .unwrap()
        .run(FailurePolicy::Abort)
        .unwrap();

    for node in ["node0", "node1"] {
        let out = fixture.output("prod", node);
        let service: Service = read_yaml(&out.join(SERVICE_FILE));
        let sts: StatefulSet = read_yaml(&out.join(STATEFUL_SET_FILE));
        let cm: ConfigMap = read_yaml(&out.join(CONFIG_MAP_FILE));

        assert_eq!(service.metadata.name, format!("prod-{}", node));
        assert_eq!(sts.metadata.name, format!("prod-{}", node));
        assert_eq!(cm.metadata.name, format!("{}-configs", node));
        assert_eq!(
            sts.spec.template.spec.volumes[0].config_map.as_ref().unwrap().name,
            cm.metadata.name
        );
    }
}

#[test]
fn config_ini_is_rewritten_for_the_cluster() {
    let fixture = Fixture::new(2);
    Generator::new(fixture.config("mychain"))
        .unwrap()
        .run(FailurePolicy::Abort)
        .unwrap();

    let written = fixture.output("mychain", "node1").join("conf/config.ini");
    let doc = IniDocument::load(&written).unwrap();
    assert_eq!(doc.get("p2p", "listen_port"), Some("30300"));
    assert_eq!(doc.get("rpc", "listen_port"), Some("20200"));
    assert_eq!(doc.get("p2p", "nodes_path"), Some("/etc/fisco/"));
    assert_eq!(doc.get("cert", "ca_path"), Some("/etc/fisco/"));
    assert_eq!(doc.get("security", "private_key_path"), Some("/etc/fisco/node.pem"));
    assert_eq!(doc.get("storage", "data_path"), Some("/data"));
    assert_eq!(doc.get("log", "log_path"), Some("/data/log"));

    let original = IniDocument::load(&fixture.node(1).join("config.ini")).unwrap();
    for (section, key) in [
        ("p2p", "sm_ssl"),
        ("p2p", "listen_ip"),
        ("p2p", "nodes_file"),
        ("rpc", "thread_count"),
        ("storage", "enable_cache"),
        ("log", "level"),
    ] {
        assert_eq!(doc.get(section, key), original.get(section, key), "[{}].{}", section, key);
    }

    let text = fs::read_to_string(&written).unwrap();
    assert!(text.contains("; directory the certificates located in"));
}

#[test]
fn config_map_keys_match_conf_directory() {
    let fixture = Fixture::new(2);
    Generator::new(fixture.config("mychain"))
        .unwrap()
        .run(FailurePolicy::Abort)
        .unwrap();

    let out = fixture.output("mychain", "node0");
    let conf_files = file_names(&out.join("conf"));
    assert_eq!(
        conf_files,
        vec!["ca.crt", "config.genesis", "config.ini", "node.nodeid", "node.pem", "nodes.json"]
    );

    let cm: ConfigMap = read_yaml(&out.join(CONFIG_MAP_FILE));
    let mut keys: Vec<_> = cm.keys().cloned().collect();
    keys.sort();
    assert_eq!(keys, conf_files);

    for name in &conf_files {
        let on_disk = fs::read_to_string(out.join("conf").join(name)).unwrap();
        assert_eq!(cm.data.get(name), Some(&on_disk), "{}", name);
    }
    assert_eq!(
        cm.data.get("config.genesis").map(String::as_str),
        Some("[chain]\n    group_id=group0\n")
    );
}

#[test]
fn stateful_set_carries_image_settings() {
    let fixture = Fixture::new(1);
    let config = GeneratorConfig {
        version: "v3.6.0".to_string(),
        image_pull_policy: ImagePullPolicy::Always,
        storage_class: "nfs".to_string(),
        ..fixture.config("mychain")
    };
    Generator::new(config).unwrap().run(FailurePolicy::Abort).unwrap();

    let sts: StatefulSet = read_yaml(&fixture.output("mychain", "node0").join(STATEFUL_SET_FILE));
    let container = &sts.spec.template.spec.containers[0];
    assert_eq!(container.image, "fiscoorg/fiscobcos:v3.6.0");
    assert_eq!(container.image_pull_policy, "Always");
    assert_eq!(sts.spec.volume_claim_templates[0].spec.storage_class_name, "nfs");
}

#[test]
fn rerun_overwrites_previous_output() {
    let fixture = Fixture::new(2);
    let generator = Generator::new(fixture.config("mychain")).unwrap();
    generator.run(FailurePolicy::Abort).unwrap();

    let out = fixture.output("mychain", "node0");
    fs::write(out.join(CONFIG_MAP_FILE), "stale").unwrap();
    fs::write(out.join("conf/leftover.txt"), "from an older run").unwrap();

    generator.run(FailurePolicy::Abort).unwrap();

    let cm: ConfigMap = read_yaml(&out.join(CONFIG_MAP_FILE));
    assert!(cm.data.contains_key("config.ini"));
    // stale destination files are not cleaned, so they are still published
    assert!(cm.data.contains_key("leftover.txt"));
}

#[test]
fn missing_section_aborts_run() {
    let fixture = Fixture::new(2);
    let ini = config_ini(1).replace("[security]\n    private_key_path=conf/node.pem\n", "");
    fs::write(fixture.node(1).join("config.ini"), ini).unwrap();

    let err = Generator::new(fixture.config("mychain"))
        .unwrap()
        .run(FailurePolicy::Abort)
        .unwrap_err();

    assert!(err.to_string().starts_with("node1: "));
    assert!(matches!(
        err.root(),
        GenError::MissingKey { section, key, .. } if section == "security" && key == "private_key_path"
    ));
}

#[test]
fn short_peer_list_is_index_error() {
    let fixture = Fixture::new(3);
    fs::write(
        fixture.node(2).join("nodes.json"),
        r#"{"nodes":["1.2.3.4:30300","1.2.3.5:30300"]}"#,
    )
    .unwrap();

    let err = Generator::new(fixture.config("mychain"))
        .unwrap()
        .run(FailurePolicy::Abort)
        .unwrap_err();
    assert!(matches!(err.root(), GenError::PeerIndex { index: 2, len: 2, .. }));
}

#[test]
fn keep_going_processes_remaining_nodes() {
    let fixture = Fixture::new(3);
    fs::remove_file(fixture.node(0).join("config.genesis")).unwrap();
    fs::write(fixture.node(1).join("nodes.json"), "{not json").unwrap();

    let report = Generator::new(fixture.config("mychain"))
        .unwrap()
        .run(FailurePolicy::KeepGoing)
        .unwrap();

    assert!(!report.is_success());
    let generated: Vec<_> = report.generated.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(generated, vec!["node2"]);
    assert_eq!(report.failed.len(), 2);
    assert!(matches!(report.failed[0].root(), GenError::NotFound { .. }));
    assert!(matches!(report.failed[1].root(), GenError::Parse { .. }));
    assert!(fixture.output("mychain", "node2").join(STATEFUL_SET_FILE).is_file());
}

#[test]
fn missing_nodes_dir_is_not_found() {
    let fixture = Fixture::new(0);
    let config = GeneratorConfig {
        nodes_dir: fixture.nodes_dir.join("missing"),
        ..fixture.config("mychain")
    };
    let err = Generator::new(config).unwrap().run(FailurePolicy::KeepGoing).unwrap_err();
    assert!(matches!(err, GenError::NotFound { .. }));
}
