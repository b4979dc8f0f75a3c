use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

fn temp_workspace() -> TempDir {
    tempfile::tempdir().expect("create tempdir")
}

fn run_command(cmd: &mut Command) {
    cmd.assert().success();
}

#[test]
fn train_encode_decode_round_trip() {
    let workspace = temp_workspace();
    let corpus_dir = workspace.path().join("corpus");
    fs::create_dir(&corpus_dir).expect("create corpus dir");
    fs::write(
        corpus_dir.join("train-en.txt"),
        "you are a helpful assistant\nthe weather today is sunny\n".repeat(20),
    )
    .expect("write english corpus");
    fs::write(corpus_dir.join("train-cn.txt"), "今天的天气很好\n".repeat(20))
        .expect("write chinese corpus");
    let vocab_path = workspace.path().join("vocab.json");

    let mut train = Command::cargo_bin("textbpe").expect("binary exists");
    train.current_dir(workspace.path()).args([
        "--quiet",
        "train",
        "corpus",
        "--vocab-size",
        "300",
        "--no-progress",
        "--special-token",
        "<|im_start|>",
        "--special-token",
        "<|im_end|>",
        "-o",
        "vocab.json",
    ]);
    run_command(&mut train);
    assert!(vocab_path.exists(), "vocab.json was created");

    let text = "<|im_start|>user\n今天的天气<|im_end|>";
    let mut encode = Command::cargo_bin("textbpe").expect("binary exists");
    let encode_output = encode
        .current_dir(workspace.path())
        .args(["--quiet", "encode", "-m", "vocab.json", "--json", text])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let encoded: Value =
        serde_json::from_slice(&encode_output).expect("encoded output is valid JSON");
    let ids = encoded["ids"]
        .as_array()
        .expect("ids array")
        .iter()
        .map(|v| v.as_u64().expect("u64 id"))
        .collect::<Vec<_>>();
    assert!(!ids.is_empty(), "some ids produced");
    assert_eq!(encoded["tokens"][0], "<|im_start|>");
    assert!(ids.len() < text.len(), "merges shortened the sequence");

    let id_args = ids.iter().map(ToString::to_string).collect::<Vec<_>>();
    let mut decode = Command::cargo_bin("textbpe").expect("binary exists");
    let mut args = vec![
        "--quiet".to_string(),
        "decode".to_string(),
        "-m".to_string(),
        "vocab.json".to_string(),
        "--output".to_string(),
        "decoded.txt".to_string(),
    ];
    args.extend(id_args);
    decode.current_dir(workspace.path()).args(args);
    run_command(&mut decode);

    let decoded = fs::read_to_string(workspace.path().join("decoded.txt"))
        .expect("read decoded output");
    assert_eq!(decoded, text);

    let mut info = Command::cargo_bin("textbpe").expect("binary exists");
    let info_output = info
        .current_dir(workspace.path())
        .args(["--quiet", "info", "-m", "vocab.json", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let summary: Value = serde_json::from_slice(&info_output).expect("info output is JSON");
    assert_eq!(summary["vocab_size"], 302);
    assert_eq!(summary["special_tokens"][1]["content"], "<|im_end|>");
    assert_eq!(summary["special_tokens"][1]["id"], 301);
}

#[test]
fn decode_rejects_unknown_ids() {
    let workspace = temp_workspace();
    fs::write(workspace.path().join("tiny.txt"), "abababab").expect("write corpus");

    let mut train = Command::cargo_bin("textbpe").expect("binary exists");
    train.current_dir(workspace.path()).args([
        "--quiet",
        "train",
        "tiny.txt",
        "--vocab-size",
        "258",
        "--no-progress",
    ]);
    run_command(&mut train);

    let mut decode = Command::cargo_bin("textbpe").expect("binary exists");
    decode
        .current_dir(workspace.path())
        .args(["--quiet", "decode", "-m", "vocab.json", "97", "5000"])
        .assert()
        .failure();
}
