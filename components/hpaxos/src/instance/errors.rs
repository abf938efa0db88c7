quick_error! {
    #[derive(Debug, Eq, PartialEq)]
    pub enum LogError {
        /// Negative instance numbers are never valid.
        Negative(i: i32) {
            display("invalid instance number: {}", i)
        }
        OutOfRange(i: i32, limit: usize) {
            display("instance {} exceeds log limit {}", i, limit)
        }
    }
}
