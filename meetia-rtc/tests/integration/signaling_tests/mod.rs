mod test_candidates_follow_signaling_state;
mod test_queued_signals_flush_on_reconnect;
mod test_signals_for_others_are_ignored;
