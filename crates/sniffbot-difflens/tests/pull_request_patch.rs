use sniffbot_difflens::parser::parse_patch;
use sniffbot_difflens::DiffLineMap;

#[test]
fn new_file_patch_from_files_api() {
    let patch = "\
@@ -0,0 +1,5 @@
+<?php
+function acme_render( $atts ) {
+\treturn '<div>' . esc_html( $atts['message'] ) . '</div>';
+}
+add_shortcode( 'acme', 'acme_render' );";
    let hunks = parse_patch(patch).unwrap();
    assert_eq!(hunks.len(), 1);
    assert_eq!(hunks[0].old_lines, 0);

    let map = DiffLineMap::from_hunks(&hunks);
    assert_eq!(map.len(), 5);
    assert!(map.contains(1));
    assert!(map.contains(5));
    assert!(!map.contains(6));
}
