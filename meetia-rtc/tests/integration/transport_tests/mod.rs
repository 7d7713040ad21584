mod test_transport_connects_with_token;
mod test_transport_reconnects_after_drop;
