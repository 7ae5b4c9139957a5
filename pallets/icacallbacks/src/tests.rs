use crate::{mock::*, CallbackEntries, Error, Event};
use codec::Encode;
use polkadot_sdk::frame_support::{assert_noop, assert_ok};
use primitives::{
  AckStatus, Acknowledgement, CallbackKind, CallbackRegistry, TxMsgData, UndelegateResponse,
};

fn register(sequence: u64, kind: CallbackKind, args: &[u8]) {
  assert_ok!(Icacallbacks::register_callback(
    b"transfer",
    b"channel-0",
    sequence,
    kind,
    args.to_vec()
  ));
}

fn ica_result(responses: Vec<Vec<u8>>) -> Vec<u8> {
  Acknowledgement::Result(TxMsgData { msg_responses: responses }.encode()).to_bytes()
}

#[test]
fn registered_callback_runs_once_and_is_reaped() {
  new_test_ext().execute_with(|| {
    register(7, CallbackKind::NativeTransfer, &[1, 2, 3]);
    System::assert_has_event(
      Event::CallbackRegistered {
        port_id: b"transfer".to_vec().try_into().unwrap(),
        channel_id: b"channel-0".to_vec().try_into().unwrap(),
        sequence: 7,
        kind: CallbackKind::NativeTransfer,
      }
      .into(),
    );

    let ack = Acknowledgement::success().to_bytes();
    assert_ok!(Icacallbacks::on_acknowledgement_packet(&transfer_packet(7), &ack, false));

    assert_eq!(
      HandledCallbacks::get(7),
      Some((CallbackKind::NativeTransfer, AckStatus::Success, vec![1, 2, 3]))
    );
    assert_eq!(CallbackEntries::<Test>::iter().count(), 0);
    System::assert_last_event(
      Event::CallbackInvoked {
        port_id: b"transfer".to_vec().try_into().unwrap(),
        channel_id: b"channel-0".to_vec().try_into().unwrap(),
        sequence: 7,
        kind: CallbackKind::NativeTransfer,
        status: AckStatus::Success,
      }
      .into(),
    );
  });
}

#[test]
fn replayed_ack_leaves_storage_untouched() {
  new_test_ext().execute_with(|| {
    register(3, CallbackKind::NativeTransfer, &[9]);
    let ack = Acknowledgement::success().to_bytes();
    assert_ok!(Icacallbacks::on_acknowledgement_packet(&transfer_packet(3), &ack, false));

    let root_before = polkadot_sdk::sp_io::storage::root(polkadot_sdk::sp_runtime::StateVersion::V1);
    assert_ok!(Icacallbacks::on_acknowledgement_packet(&transfer_packet(3), &ack, false));
    let root_after = polkadot_sdk::sp_io::storage::root(polkadot_sdk::sp_runtime::StateVersion::V1);
    assert_eq!(root_before, root_after);
  });
}

#[test]
fn unknown_packet_is_a_no_op() {
  new_test_ext().execute_with(|| {
    assert_ok!(Icacallbacks::on_timeout_packet(&transfer_packet(42)));
    assert_eq!(HandledCallbacks::get(42), None);
  });
}

#[test]
fn timeout_is_delivered_as_timeout_status() {
  new_test_ext().execute_with(|| {
    register(5, CallbackKind::Delegate, &[]);
    assert_ok!(Icacallbacks::on_timeout_packet(&transfer_packet(5)));
    assert_eq!(HandledCallbacks::get(5).map(|(_, status, _)| status), Some(AckStatus::Timeout));
  });
}

#[test]
fn error_ack_is_delivered_as_failure() {
  new_test_ext().execute_with(|| {
    register(6, CallbackKind::NativeTransfer, &[]);
    let ack = Acknowledgement::error("insufficient funds").to_bytes();
    assert_ok!(Icacallbacks::on_acknowledgement_packet(&transfer_packet(6), &ack, false));
    assert_eq!(HandledCallbacks::get(6).map(|(_, status, _)| status), Some(AckStatus::Failure));
  });
}

#[test]
fn handler_error_keeps_the_entry_and_rolls_back() {
  new_test_ext().execute_with(|| {
    register(8, CallbackKind::NativeTransfer, FAILING_ARGS);
    let ack = Acknowledgement::success().to_bytes();
    assert!(Icacallbacks::on_acknowledgement_packet(&transfer_packet(8), &ack, false).is_err());

    assert_eq!(HandledCallbacks::get(8), None);
    assert_eq!(CallbackEntries::<Test>::iter().count(), 1);
  });
}

#[test]
fn unrouted_kind_is_rejected() {
  new_test_ext().execute_with(|| {
    register(9, CallbackKind::Claim, &[]);
    assert_noop!(
      Icacallbacks::on_timeout_packet(&transfer_packet(9)),
      Error::<Test>::CallbackHandlerNotFound
    );
  });
}

#[test]
fn parse_acknowledgement_shapes() {
  new_test_ext().execute_with(|| {
    let failure = Icacallbacks::parse_acknowledgement(
      &Acknowledgement::error("boom").to_bytes(),
      true,
    )
    .unwrap();
    assert_eq!(failure.status, AckStatus::Failure);
    assert_eq!(failure.error, "boom");

    assert_noop!(
      Icacallbacks::parse_acknowledgement(&Acknowledgement::Result(vec![]).to_bytes(), false),
      Error::<Test>::InvalidAcknowledgement
    );
    assert_noop!(
      Icacallbacks::parse_acknowledgement(b"garbage", false),
      Error::<Test>::InvalidAcknowledgement
    );
    assert_noop!(
      Icacallbacks::parse_acknowledgement(&Acknowledgement::Result(vec![0xff]).to_bytes(), true),
      Error::<Test>::InvalidAcknowledgement
    );

    let response = UndelegateResponse { completion_time: 1_700_000_000 }.encode();
    let success = Icacallbacks::parse_acknowledgement(&ica_result(vec![response.clone()]), true)
      .unwrap();
    assert_eq!(success.status, AckStatus::Success);
    assert_eq!(success.msg_responses, vec![response]);

    let transfer =
      Icacallbacks::parse_acknowledgement(&Acknowledgement::success().to_bytes(), false).unwrap();
    assert_eq!(transfer.status, AckStatus::Success);
    assert!(transfer.msg_responses.is_empty());
  });
}

#[test]
fn oversized_callback_args_are_rejected() {
  new_test_ext().execute_with(|| {
    assert_noop!(
      Icacallbacks::register_callback(
        b"transfer",
        b"channel-0",
        1,
        CallbackKind::NativeTransfer,
        vec![0u8; 16_385]
      ),
      Error::<Test>::CallbackArgsTooLong
    );
  });
}
