fn main() {
    tradetrace_lib::run()
}
