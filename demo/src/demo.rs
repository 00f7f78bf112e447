use std::path::PathBuf;

use anyhow::{Context as _, Result};
use engine::audio::{self, Voice};
use engine::render::texture::{self, GpuTexture};
use engine::{LoadContext, Scene};

const IMAGE_FILE: &str = "images/duck.png";
const WAV_FILE: &str = "audio/duck-quacking-loudly-three-times.wav";
const OGG_FILE: &str = "audio/duck_vocalizations.ogg";

enum ImagePanel {
    Loaded {
        id: egui::TextureId,
        // Keeps the GPU texture alive for as long as egui references it.
        texture: GpuTexture,
    },
    Failed,
}

/// The demo content: one texture shown in a viewer panel, two audio clips
/// behind play buttons.
pub struct Demo {
    assets: PathBuf,
    image: ImagePanel,
    mono_voice: Option<Voice>,
    stereo_voice: Option<Voice>,
}

impl Demo {
    pub fn new(assets: PathBuf) -> Self {
        Self {
            assets,
            image: ImagePanel::Failed,
            mono_voice: None,
            stereo_voice: None,
        }
    }
}

impl Scene for Demo {
    fn load(&mut self, ctx: &mut LoadContext) -> Result<()> {
        // Texture load failure is the one non-fatal case; the panel reports
        // it instead.
        match texture::load_rgba(&self.assets.join(IMAGE_FILE)) {
            Ok(pixels) => {
                let texture = GpuTexture::from_rgba(
                    ctx.graphics.device(),
                    ctx.graphics.queue(),
                    &pixels,
                    IMAGE_FILE,
                );
                let id = ctx.ui.register_texture(ctx.graphics, &texture.view);
                self.image = ImagePanel::Loaded { id, texture };
            }
            Err(err) => {
                log::warn!("failed to load {IMAGE_FILE}: {err}");
                self.image = ImagePanel::Failed;
            }
        }

        let wav = audio::load_wav(&self.assets.join(WAV_FILE))
            .with_context(|| format!("failed to load WAV file {WAV_FILE}"))?;
        log::info!(
            "{WAV_FILE}: {} channel(s), {} Hz, {} frames",
            wav.channels(),
            wav.sample_rate(),
            wav.frames()
        );
        self.mono_voice = Some(ctx.audio.voice(wav)?);

        let ogg = audio::load_ogg(&self.assets.join(OGG_FILE))
            .with_context(|| format!("failed to load OGG file {OGG_FILE}"))?;
        log::info!(
            "{OGG_FILE}: {} channel(s), {} Hz, {} frames",
            ogg.channels(),
            ogg.sample_rate(),
            ogg.frames()
        );
        self.stereo_voice = Some(ctx.audio.voice(ogg)?);

        Ok(())
    }

    fn ui(&mut self, ctx: &egui::Context) {
        egui::Window::new("Texture Test").show(ctx, |ui| match &self.image {
            ImagePanel::Loaded { id, texture } => {
                ui.label(format!("handle = {id:?}"));
                ui.label(format!("size = {} x {}", texture.width, texture.height));
                ui.image((
                    *id,
                    egui::vec2(texture.width as f32, texture.height as f32),
                ));
            }
            ImagePanel::Failed => {
                ui.label("Failed to load texture image...");
            }
        });

        egui::Window::new("Audio Test").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Play Mono SFX").clicked() {
                    if let Some(voice) = &self.mono_voice {
                        voice.play();
                    }
                }
                if ui.button("Play Stereo SFX").clicked() {
                    if let Some(voice) = &self.stereo_voice {
                        voice.play();
                    }
                }
            });
        });
    }
}
