mod test_screen_share_start_and_stop;
