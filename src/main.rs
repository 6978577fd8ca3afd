#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

fn main() {
    bakery_menu_lib::run()
}
