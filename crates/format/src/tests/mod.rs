mod header_tests;
mod layout_tests;
