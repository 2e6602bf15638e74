use dfkernel_build::{
    BuildError, BuildRecord, BuildRequest, ContainerEngine, RecordStream, Result, Session,
};
use dfkernel_config::KernelConfig;
use dfkernel_dispatch::Kernel;
use futures_util::stream::{self, StreamExt};
use std::fs;
use std::sync::Mutex;

/// `RUN false` を含むビルドだけ失敗し、それ以外は連番のIDで成功するエンジン
#[derive(Default)]
pub struct StubEngine {
    dockerfiles: Mutex<Vec<String>>,
    tags: Mutex<Vec<(String, String, Option<String>)>>,
}

#[allow(dead_code)]
impl StubEngine {
    pub fn dockerfiles(&self) -> Vec<String> {
        self.dockerfiles.lock().unwrap().clone()
    }

    pub fn tags(&self) -> Vec<(String, String, Option<String>)> {
        self.tags.lock().unwrap().clone()
    }
}

impl ContainerEngine for StubEngine {
    async fn build<'a>(&'a self, request: BuildRequest<'_>) -> Result<RecordStream<'a>> {
        let dockerfile =
            fs::read_to_string(request.context_dir.join(request.dockerfile)).map_err(BuildError::Io)?;

        let records = if dockerfile.contains("RUN false") {
            vec![
                BuildRecord::Stream("Step 2/2 : RUN false\n".to_string()),
                BuildRecord::Error(
                    "The command '/bin/sh -c false' returned a non-zero code: 1".to_string(),
                ),
            ]
        } else {
            let mut dockerfiles = self.dockerfiles.lock().unwrap();
            let id = format!("sha256:{:016x}", dockerfiles.len() + 1);
            dockerfiles.push(dockerfile);
            vec![
                BuildRecord::Stream(" ---> done\n".to_string()),
                BuildRecord::Aux { id },
            ]
        };

        Ok(stream::iter(records.into_iter().map(Ok)).boxed())
    }

    async fn tag(&self, image_id: &str, repo: &str, tag: Option<&str>) -> Result<()> {
        self.tags.lock().unwrap().push((
            image_id.to_string(),
            repo.to_string(),
            tag.map(str::to_string),
        ));
        Ok(())
    }
}

pub fn kernel() -> Kernel<Session<StubEngine>> {
    let session = Session::new(StubEngine::default(), &KernelConfig::default()).unwrap();
    Kernel::new(session)
}
