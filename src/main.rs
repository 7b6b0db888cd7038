fn main() {
    santa_widget_lib::run()
}
