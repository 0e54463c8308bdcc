#![cfg(unix)]

mod common;

use std::time::Duration;

use common::FakeToolkit;
use sslforge::{CommandLog, ProcessRunner, ToolkitCommand, WorkflowError};
use tokio_util::sync::CancellationToken;

fn runner(fake: &FakeToolkit) -> ProcessRunner {
    ProcessRunner::new(&fake.program, CommandLog::new())
}

#[tokio::test]
async fn success_captures_stdout_and_logs_once() {
    let fake = FakeToolkit::new();
    let runner = runner(&fake);

    let result = runner.run(&ToolkitCommand::new("version")).await.unwrap();

    assert_eq!(result.exit_code, 0);
    assert!(result.stdout_text().starts_with("OpenSSL 3.0.2"));
    assert_eq!(
        result.command,
        format!("{} version", fake.program.display())
    );
    assert_eq!(runner.log().len(), 1);
    assert_eq!(runner.log().last().map(|r| r.command), Some(result.command));
}

#[tokio::test]
async fn stdin_payload_is_written_and_closed() {
    let fake = FakeToolkit::new();
    let runner = runner(&fake);

    let cmd = ToolkitCommand::new("echo-stdin").stdin("hunter2");
    let result = runner.run(&cmd).await.unwrap();

    assert_eq!(result.stdout_text(), "hunter2");
}

#[tokio::test]
async fn failure_carries_structured_result() {
    let fake = FakeToolkit::new();
    let runner = runner(&fake);

    let err = runner.run(&ToolkitCommand::new("fail")).await.unwrap_err();

    let result = err.command_result().expect("structured failure");
    assert_eq!(result.exit_code, 3);
    assert_eq!(result.stderr_text(), "fake failure\n");
    assert!(result.command.ends_with(" fail"));
    assert!(err.to_string().contains("exited with code 3: fake failure"));
    assert_eq!(runner.log().len(), 1);
}

#[tokio::test]
async fn silent_exits_settle_once_streams_close() {
    let fake = FakeToolkit::new();
    let runner = runner(&fake);

    let ok = runner.run(&ToolkitCommand::new("quiet")).await.unwrap();
    assert_eq!(ok.exit_code, 0);
    assert!(ok.stdout.is_empty());

    let err = runner.run(&ToolkitCommand::new("quiet-fail")).await.unwrap_err();
    assert_eq!(err.command_result().map(|r| r.exit_code), Some(4));

    assert_eq!(runner.log().len(), 2);
}

#[tokio::test]
async fn file_output_settles_without_stdout() {
    let fake = FakeToolkit::new();
    let runner = runner(&fake);
    let out = fake.path("out.pem");

    let cmd = ToolkitCommand::new("genpkey").path_opt("-out", &out);
    let result = runner.run(&cmd).await.unwrap();

    assert!(result.stdout.is_empty());
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "fake genpkey output\n");
}

#[tokio::test]
async fn warnings_on_stderr_do_not_fail_a_zero_exit() {
    let fake = FakeToolkit::new();
    let runner = runner(&fake);

    let result = runner.run(&ToolkitCommand::new("warn")).await.unwrap();

    assert!(result.success());
    assert_eq!(result.stdout_text(), "done\n");
}

#[tokio::test]
async fn large_stdout_is_captured_in_full() {
    let fake = FakeToolkit::new();
    let runner = runner(&fake);
    let cmd = ToolkitCommand::new("flood").arg("300000");

    // Output spans many pipe reads; repeat to catch a settle that races the pipe
    for _ in 0..10 {
        let result = runner.run(&cmd).await.unwrap();
        assert_eq!(result.stdout.len(), 300_000);
        assert!(result.stdout.iter().all(|&b| b == b'a'));
    }
    assert_eq!(runner.log().len(), 10);
}

#[tokio::test]
async fn large_stderr_is_captured_in_full_on_failure() {
    let fake = FakeToolkit::new();
    let runner = runner(&fake);
    let cmd = ToolkitCommand::new("flood-fail").arg("150000");

    for _ in 0..10 {
        let err = runner.run(&cmd).await.unwrap_err();
        let result = err.command_result().expect("structured failure");
        assert_eq!(result.exit_code, 5);
        assert_eq!(result.stderr.len(), 150_000);
        assert!(result.stdout.is_empty());
    }
}

#[tokio::test]
async fn missing_binary_is_a_launch_error() {
    let fake = FakeToolkit::new();
    let runner = ProcessRunner::new(fake.path("no-such-openssl"), CommandLog::new());

    let err = runner.run(&ToolkitCommand::new("version")).await.unwrap_err();

    assert!(matches!(err, WorkflowError::ProcessLaunch { .. }));
    assert!(runner.log().is_empty());
}

#[tokio::test]
async fn hung_process_times_out() {
    let fake = FakeToolkit::new();
    let runner = runner(&fake).with_timeout(Some(Duration::from_millis(200)));

    let err = runner.run(&ToolkitCommand::new("sleep")).await.unwrap_err();

    match err {
        WorkflowError::Timeout { command, after } => {
            assert!(command.ends_with(" sleep"));
            assert_eq!(after, Duration::from_millis(200));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert!(runner.log().is_empty());
}

#[tokio::test]
async fn cancellation_abandons_the_invocation() {
    let fake = FakeToolkit::new();
    let runner = runner(&fake);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = runner
        .run_cancellable(&ToolkitCommand::new("sleep"), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::Cancelled { .. }));
    assert!(runner.log().is_empty());
}

#[tokio::test]
async fn shared_log_sees_every_runner() {
    let fake = FakeToolkit::new();
    let log = CommandLog::new();
    let first = ProcessRunner::new(&fake.program, log.clone());
    let second = ProcessRunner::new(&fake.program, log.clone());

    first.run(&ToolkitCommand::new("version")).await.unwrap();
    let _ = second.run(&ToolkitCommand::new("fail")).await;

    let entries = log.snapshot();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].success());
    assert_eq!(entries[1].exit_code, 3);
    assert_eq!(fake.invocations(), vec!["version", "fail"]);
}
