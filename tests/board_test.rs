use multiview_match::board::{Board, BoardConfig, create_default_6x6_board};

#[test]
fn test_board_init() {
    let board = create_default_6x6_board();
    // 6x6 tags, 4 corners per tag
    assert_eq!(board.corners_per_board(), 6 * 6 * 4);
    assert_eq!(board.corner_index(0, 0), Some(0));
    assert_eq!(board.corner_index(0, 3), Some(3));
    assert_eq!(board.corner_index(35, 3), Some(143));
    assert_eq!(board.corner_index(36, 0), None);
    assert_eq!(board.corner_index(1, 4), None);
}

#[test]
fn test_board_first_id_offset() {
    let board = Board::from_config(&BoardConfig {
        tag_rows: 2,
        tag_cols: 3,
        first_id: 10,
    });
    assert_eq!(board.corners_per_board(), 24);
    assert_eq!(board.corner_index(9, 0), None);
    assert_eq!(board.corner_index(10, 1), Some(1));
    assert_eq!(board.corner_index(15, 2), Some(22));
    assert_eq!(board.corner_index(16, 0), None);
}

#[test]
fn test_board_config_from_json() {
    let config: BoardConfig = serde_json::from_str(r#"{"tag_rows": 4}"#).unwrap();
    assert_eq!(config.tag_rows, 4);
    assert_eq!(config.tag_cols, 6);
    assert_eq!(config.first_id, 0);
}
