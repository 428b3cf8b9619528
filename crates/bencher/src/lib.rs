//! Fixtures shared by the micro-proxy benchmarks.

/// Which side of the proxy a fixture comes from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    /// Client to proxy, or proxy to origin
    Request,
    /// Origin to proxy, or a cached response
    Response,
}

#[derive(Debug, Copy, Clone)]
pub struct TestFile {
    file_name: &'static str,
    direction: Direction,
    content: &'static str,
}

impl TestFile {
    pub const fn request(file_name: &'static str, content: &'static str) -> Self {
        Self { file_name, direction: Direction::Request, content }
    }

    pub const fn response(file_name: &'static str, content: &'static str) -> Self {
        Self { file_name, direction: Direction::Response, content }
    }

    pub fn content(&self) -> &'static str {
        self.content
    }

    pub fn bytes(&self) -> &'static [u8] {
        self.content.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn file_name(&self) -> &'static str {
        self.file_name
    }
}

pub static GET_SMALL: TestFile = TestFile::request("get_small.txt", include_str!("../resources/request/get_small.txt"));
pub static GET_LARGE: TestFile = TestFile::request("get_large.txt", include_str!("../resources/request/get_large.txt"));
pub static OK_1K: TestFile = TestFile::response("ok_1k.txt", include_str!("../resources/response/ok_1k.txt"));

/// A named benchmark input.
#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    file: TestFile,
}

impl TestCase {
    pub fn new(name: &'static str, file: TestFile) -> Self {
        Self { name, file }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn file(&self) -> &TestFile {
        &self.file
    }

    pub fn file_name(&self) -> &'static str {
        self.file.file_name
    }
}

/// Every fixture, in the order benchmarks report them.
pub fn all_cases() -> Vec<TestCase> {
    vec![
        TestCase::new("small_request", GET_SMALL),
        TestCase::new("large_request", GET_LARGE),
        TestCase::new("response_1k", OK_1K),
    ]
}
