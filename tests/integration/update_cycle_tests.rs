//! Full poll cycles against the simulated network, flash and NVM.

use log::Level;
use otaresolver::CycleOutcome;
use otaresolver::adapters::flash::OtaFlashSink;
use otaresolver::adapters::http::{HttpAdapter, SimResponse};
use otaresolver::app::ports::FlashSink;
use otaresolver::error::{Error, StorageError, TransportError, WriteError};
use otaresolver::ota::UpdateState;

use super::mocks::{
    FIRMWARE_URL, Fixture, MANIFEST_URL, TOKEN, TestService, build, build_with_region, firmware,
    fixture, fixture_with, manifest, region_with,
};

fn stored(service: &TestService) -> &[u8] {
    let image = service.nvm().image();
    let end = image.iter().position(|&b| b == 0).unwrap_or(image.len());
    &image[..end]
}

// ── Happy paths ──────────────────────────────────────────────

#[test]
fn newer_version_is_flashed_persisted_and_restarted() {
    let mut f = fixture("1.0.0", 5000);
    assert_eq!(f.service.current_version(), "1.0.0");

    let outcome = f.service.check_now();

    assert_eq!(outcome, CycleOutcome::Applied { bytes: 5000 });
    assert_eq!(f.service.update_state(), UpdateState::Applied);
    assert_eq!(f.service.flash().image(), f.image.as_slice());
    assert_eq!(f.service.flash().expected_size(), Some(5000));
    assert!(f.service.flash().is_finished());
    assert_eq!(stored(&f.service), b"1.1.0");
    assert_eq!(f.service.current_version(), "1.1.0");
    assert_eq!(f.service.restart().requests(), 1);
    assert!(!f.service.events().saw("tick executed"));
}

#[test]
fn every_request_carries_the_bearer_token() {
    let mut f = fixture("1.0.0", 100);
    f.service.check_now();

    let requests = f.service.http().requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].url, MANIFEST_URL);
    assert_eq!(requests[1].url, FIRMWARE_URL);
    let expected = format!("Bearer {TOKEN}");
    assert!(
        requests
            .iter()
            .all(|r| r.authorization.as_deref() == Some(expected.as_str()))
    );
}

#[test]
fn unknown_length_runs_until_close_then_finalizes() {
    let mut f = fixture_with("1.0.0", 4321, OtaFlashSink::new(), SimResponse::without_length);

    assert_eq!(f.service.check_now(), CycleOutcome::Applied { bytes: 4321 });
    assert_eq!(f.service.flash().expected_size(), None);
    assert_eq!(f.service.flash().image(), f.image.as_slice());
    assert_eq!(stored(&f.service), b"1.1.0");
    assert!(f.service.restart().requested());
    assert!(f.service.events().saw("downloaded 4321 of unknown bytes"));
}

#[test]
fn blank_region_is_a_first_install() {
    let mut f = fixture("", 2048);
    assert_eq!(f.service.current_version(), "");
    assert!(f.service.events().saw("version not found in nvm"));

    assert_eq!(f.service.check_now(), CycleOutcome::Applied { bytes: 2048 });
    assert!(f.service.events().saw("current version: <none>"));
}

#[test]
fn corrupted_region_is_reset_then_treated_as_first_install() {
    let mut f = fixture("1.0", 512);
    assert_eq!(f.service.current_version(), "");
    assert!(f.service.nvm().image().iter().all(|&b| b == 0));
    assert!(f.service.events().saw("version format is not valid"));

    assert_eq!(f.service.check_now(), CycleOutcome::Applied { bytes: 512 });
}

#[test]
fn empty_record_with_stale_bytes_is_zeroed_at_startup() {
    let mut image = [0xFF; 64];
    image[0] = 0;
    let mut http = HttpAdapter::new();
    http.route(MANIFEST_URL, manifest("1.1.0", FIRMWARE_URL));
    http.route(FIRMWARE_URL, SimResponse::ok(firmware(256)));
    let mut f = build_with_region(
        otaresolver::adapters::nvs::NvsRegion::with_image(image),
        http,
        OtaFlashSink::new(),
        firmware(256),
    );

    assert_eq!(f.service.current_version(), "");
    assert_eq!(f.service.nvm().commits(), 1);
    assert!(f.service.nvm().image().iter().all(|&b| b == 0));
    assert_eq!(f.service.check_now(), CycleOutcome::Applied { bytes: 256 });
    assert_eq!(stored(&f.service), b"1.1.0");
}

#[test]
fn stalled_stream_yields_instead_of_failing() {
    let mut f = fixture_with("1.0.0", 3000, OtaFlashSink::new(), |r| r.stalling(4));

    assert_eq!(f.service.check_now(), CycleOutcome::Applied { bytes: 3000 });
    assert_eq!(f.pauses.get(), 4);
}

// ── Nothing to do ────────────────────────────────────────────

#[test]
fn same_version_is_up_to_date() {
    let mut f = fixture("1.1.0", 100);

    assert_eq!(f.service.check_now(), CycleOutcome::UpToDate);
    assert_eq!(f.service.http().requests().len(), 1);
    assert_eq!(f.service.restart().requests(), 0);
    assert!(f.service.events().saw("tick executed"));
}

#[test]
fn older_candidate_is_not_installed() {
    let mut f = fixture("1.10.0", 100);
    assert_eq!(f.service.check_now(), CycleOutcome::UpToDate);
    assert_eq!(f.service.flash().chunks_written(), 0);
}

#[test]
fn invalid_candidate_is_not_installed() {
    let mut http = HttpAdapter::new();
    http.route(MANIFEST_URL, manifest("1.2", FIRMWARE_URL));
    let mut f = build("1.0.0", http, OtaFlashSink::new(), Vec::new());

    assert_eq!(f.service.check_now(), CycleOutcome::UpToDate);
    assert_eq!(f.service.http().requests().len(), 1);
    let warned = f
        .service
        .events()
        .levels
        .iter()
        .any(|&l| l == Level::Warn);
    assert!(warned);
}

#[test]
fn manifest_404_is_no_candidate() {
    let mut http = HttpAdapter::new();
    http.route(MANIFEST_URL, SimResponse::with_status(404, "not found"));
    let mut f = build("1.0.0", http, OtaFlashSink::new(), Vec::new());

    assert_eq!(f.service.check_now(), CycleOutcome::NoCandidate);
    assert!(f.service.events().saw("unexpected HTTP status 404"));
    assert!(f.service.events().saw("version info not found"));
    assert_eq!(f.service.http().requests().len(), 1);
}

#[test]
fn unreachable_manifest_is_no_candidate() {
    let mut f = build("1.0.0", HttpAdapter::new(), OtaFlashSink::new(), Vec::new());
    assert_eq!(f.service.check_now(), CycleOutcome::NoCandidate);
    assert!(f.service.events().saw("connection failed"));
}

#[test]
fn malformed_manifest_is_no_candidate() {
    let mut http = HttpAdapter::new();
    http.route(MANIFEST_URL, SimResponse::ok("{\"latest_version\": 1.1"));
    let mut f = build("1.0.0", http, OtaFlashSink::new(), Vec::new());

    assert_eq!(f.service.check_now(), CycleOutcome::NoCandidate);
    assert!(f.service.events().saw("manifest is not valid JSON"));
}

#[test]
fn manifest_without_url_is_no_candidate() {
    let mut http = HttpAdapter::new();
    http.route(MANIFEST_URL, SimResponse::ok(r#"{"latest_version":"9.9.9"}"#));
    let mut f = build("1.0.0", http, OtaFlashSink::new(), Vec::new());
    assert_eq!(f.service.check_now(), CycleOutcome::NoCandidate);
}

#[test]
fn oversized_manifest_is_rejected() {
    let mut http = HttpAdapter::new();
    http.route(MANIFEST_URL, SimResponse::ok(vec![b' '; 5000]));
    let mut f = build("1.0.0", http, OtaFlashSink::new(), Vec::new());
    assert_eq!(f.service.check_now(), CycleOutcome::NoCandidate);
    assert!(f.service.events().saw("body exceeds 4096 bytes"));
}

// ── Failures leave the device untouched ──────────────────────

fn assert_untouched(f: &Fixture) {
    assert_eq!(f.service.update_state(), UpdateState::Failed);
    assert!(!f.service.flash().is_finished());
    assert_eq!(f.service.nvm().commits(), 0);
    assert_eq!(f.service.current_version(), "1.0.0");
    assert_eq!(stored(&f.service), b"1.0.0");
    assert!(!f.service.restart().requested());
    assert!(f.service.events().saw("update failed"));
}

#[test]
fn short_write_on_third_chunk_aborts_without_finalize() {
    let mut flash = OtaFlashSink::new();
    flash.short_write_on_chunk(Some(2));
    let mut f = fixture_with("1.0.0", 5000, flash, |r| r.in_segments(1024));

    assert_eq!(
        f.service.check_now(),
        CycleOutcome::Failed(Error::Write(WriteError::ShortWrite {
            written: 512,
            requested: 1024,
        }))
    );
    assert_eq!(f.service.flash().chunks_written(), 3);
    assert_eq!(f.service.flash().aborts(), 1);
    assert_untouched(&f);
}

#[test]
fn firmware_status_other_than_200_never_opens_the_partition() {
    let mut http = HttpAdapter::new();
    http.route(MANIFEST_URL, manifest("1.1.0", FIRMWARE_URL));
    http.route(FIRMWARE_URL, SimResponse::with_status(206, firmware(10)));
    let mut f = build("1.0.0", http, OtaFlashSink::new(), Vec::new());

    assert_eq!(
        f.service.check_now(),
        CycleOutcome::Failed(Error::Transport(TransportError::Status(206)))
    );
    assert_eq!(f.service.flash().chunks_written(), 0);
    assert_eq!(f.service.flash().aborts(), 0);
    assert_untouched(&f);
}

#[test]
fn early_close_with_known_length_is_a_dropped_connection() {
    let mut f = fixture_with("1.0.0", 4096, OtaFlashSink::new(), |r| r.closing_after(1500));

    assert_eq!(
        f.service.check_now(),
        CycleOutcome::Failed(Error::Transport(TransportError::ConnectionDropped {
            received: 1500,
            expected: 4096,
        }))
    );
    assert_eq!(f.service.flash().aborts(), 1);
    assert_untouched(&f);
}

#[test]
fn read_error_mid_body_aborts() {
    let mut f = fixture_with("1.0.0", 4096, OtaFlashSink::new(), |r| r.failing_at(2000));

    assert_eq!(
        f.service.check_now(),
        CycleOutcome::Failed(Error::Transport(TransportError::Read))
    );
    assert_eq!(f.service.flash().aborts(), 1);
    assert_untouched(&f);
}

#[test]
fn begin_failure_is_reported() {
    let mut flash = OtaFlashSink::new();
    flash.fail_begin(true);
    let mut f = fixture_with("1.0.0", 100, flash, |r| r);

    assert_eq!(
        f.service.check_now(),
        CycleOutcome::Failed(Error::Write(WriteError::BeginFailed))
    );
    assert_eq!(f.service.flash().aborts(), 0);
    assert_untouched(&f);
}

#[test]
fn finalize_failure_is_reported() {
    let mut flash = OtaFlashSink::new();
    flash.fail_finalize(true);
    let mut f = fixture_with("1.0.0", 100, flash, |r| r);

    assert_eq!(
        f.service.check_now(),
        CycleOutcome::Failed(Error::Write(WriteError::FinalizeFailed))
    );
    assert_eq!(f.service.flash().aborts(), 1);
    assert_untouched(&f);
}

#[test]
fn unfinished_image_after_finalize_is_reported() {
    let mut flash = OtaFlashSink::new();
    flash.leave_unfinished(true);
    let mut f = fixture_with("1.0.0", 100, flash, |r| r);

    assert_eq!(
        f.service.check_now(),
        CycleOutcome::Failed(Error::Write(WriteError::Incomplete))
    );
    assert_eq!(f.service.flash().aborts(), 1);
    assert_untouched(&f);
}

#[test]
fn failed_attempt_is_retried_on_the_next_cycle() {
    let mut f = fixture_with("1.0.0", 3000, OtaFlashSink::new(), |r| r.closing_after(100));
    assert!(matches!(f.service.check_now(), CycleOutcome::Failed(_)));

    f.service
        .http_mut()
        .route(FIRMWARE_URL, SimResponse::ok(f.image.clone()));
    assert_eq!(f.service.check_now(), CycleOutcome::Applied { bytes: 3000 });
    assert_eq!(f.service.flash().image(), f.image.as_slice());
}

#[test]
fn failed_version_commit_still_restarts_into_new_image() {
    // Region stays readable but refuses the commit.
    let mut region = region_with("1.0.0");
    region.set_fail_commit(true);
    let image = firmware(100);
    let mut http = HttpAdapter::new();
    http.route(MANIFEST_URL, manifest("1.1.0", FIRMWARE_URL));
    http.route(FIRMWARE_URL, SimResponse::ok(image.clone()));
    let mut f = build_with_region(region, http, OtaFlashSink::new(), image);

    assert_eq!(f.service.check_now(), CycleOutcome::Applied { bytes: 100 });
    assert!(f.service.restart().requested());
    assert_eq!(f.service.current_version(), "1.0.0");
    let reported = StorageError::CommitFailed.to_string();
    assert!(f.service.events().saw(&reported));
}

#[test]
fn manifest_numbers_are_compared_numerically() {
    let mut http = HttpAdapter::new();
    http.route(MANIFEST_URL, manifest("1.10.0", FIRMWARE_URL));
    http.route(FIRMWARE_URL, SimResponse::ok(firmware(64)));
    let mut f = build("1.9.9", http, OtaFlashSink::new(), Vec::new());

    assert_eq!(f.service.check_now(), CycleOutcome::Applied { bytes: 64 });
    assert_eq!(stored(&f.service), b"1.10.0");
}
