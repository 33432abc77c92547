//! End-to-end renderer scenarios against the mock provider.

use ash::vk::{self, Handle};
use quadview_app::Engine;
use quadview_core::{MemoryAssetSource, QuadVertex};
use quadview_gpu::{GpuError, MemoryLocation};
use quadview_render::{Renderer, RendererConfig, TexturePath};

use crate::fixtures::{self, checker_texel};
use crate::{ready_renderer, MockConfig, MockEvent, MockGpu};

const PORTRAIT: (u32, u32) = (1080, 1920);

fn config() -> RendererConfig {
    RendererConfig::default().with_validation(false)
}

fn renderer(gpu: &MockGpu) -> Renderer {
    ready_renderer(gpu, config(), PORTRAIT, (4, 4)).unwrap()
}

fn names(events: &[MockEvent]) -> String {
    events
        .iter()
        .map(MockEvent::name)
        .collect::<Vec<_>>()
        .join("\n")
}

fn position(events: &[MockEvent], pred: impl Fn(&MockEvent) -> bool) -> usize {
    events.iter().position(pred).unwrap()
}

fn acquired_semaphores(gpu: &MockGpu) -> Vec<u64> {
    gpu.events()
        .iter()
        .filter_map(|e| match e {
            MockEvent::AcquireNextImage { semaphore, .. } => Some(*semaphore),
            _ => None,
        })
        .collect()
}

fn created_swapchains(gpu: &MockGpu) -> Vec<(u64, u64, (u32, u32))> {
    gpu.events()
        .iter()
        .filter_map(|e| match e {
            MockEvent::CreateSwapchain {
                swapchain,
                old_swapchain,
                extent,
                ..
            } => Some((*swapchain, *old_swapchain, *extent)),
            _ => None,
        })
        .collect()
}

fn assert_released(gpu: &MockGpu) {
    assert!(
        gpu.live_objects().is_empty(),
        "leaked objects: {:?}",
        gpu.live_objects()
    );
    assert!(
        gpu.invalid_destroys().is_empty(),
        "invalid destroys: {:?}",
        gpu.invalid_destroys()
    );
    assert!(!gpu.device_alive());
    assert!(!gpu.instance_alive());
}

fn is_present(e: &MockEvent) -> bool {
    matches!(e, MockEvent::QueuePresent { .. })
}

#[test]
fn baseline_device_reaches_ready() {
    let gpu = MockGpu::default();
    let renderer = renderer(&gpu);

    assert!(renderer.is_ready());
    let stats = renderer.stats().unwrap();
    assert_eq!(stats.extent, PORTRAIT);
    assert_eq!(stats.image_count, 3);
    assert_eq!(stats.command_buffers, 3);
    assert_eq!(stats.semaphores, 8);
    assert_eq!(stats.framebuffers_created, 0);

    let events = gpu.events();
    assert!(events.contains(&MockEvent::CreateInstance {
        api_version: vk::API_VERSION_1_1,
        extensions: vec![
            "VK_KHR_surface".to_string(),
            "VK_KHR_android_surface".to_string()
        ],
        validation: false,
    }));
    assert!(events.contains(&MockEvent::CreateDevice {
        queue_family: 0,
        extensions: vec!["VK_KHR_swapchain".to_string()],
    }));

    let swapchain = events
        .iter()
        .find_map(|e| match e {
            MockEvent::CreateSwapchain {
                min_image_count,
                format,
                present_mode,
                composite_alpha,
                old_swapchain,
                ..
            } => Some((
                *min_image_count,
                *format,
                *present_mode,
                *composite_alpha,
                *old_swapchain,
            )),
            _ => None,
        })
        .unwrap();
    assert_eq!(
        swapchain,
        (
            3,
            vk::Format::R8G8B8A8_UNORM,
            vk::PresentModeKHR::FIFO,
            vk::CompositeAlphaFlagsKHR::INHERIT,
            0
        )
    );

    assert_eq!(gpu.live_count("semaphore"), 8);
    assert_eq!(gpu.live_count("command_buffer"), 3);
    assert_eq!(gpu.live_count("framebuffer"), 0);
    assert_eq!(gpu.live_count("fence"), 0);
}

#[test]
fn old_api_version_fails_before_any_object() {
    let gpu = MockGpu::new(MockConfig::default().with_api_version(vk::API_VERSION_1_0));
    let assets = fixtures::assets(4, 4).unwrap();
    let mut renderer = Renderer::new(gpu.loader(), config());

    let err = renderer
        .initialize(&fixtures::window(), PORTRAIT, &assets)
        .unwrap_err();
    assert!(matches!(err, GpuError::UnsupportedApiVersion { .. }));
    assert!(!renderer.is_ready());
    assert!(gpu.events().is_empty());
    assert_released(&gpu);
}

#[test]
fn unusable_devices_release_everything() {
    let cases: Vec<(MockConfig, fn(&GpuError) -> bool)> = vec![
        (
            MockConfig {
                device_count: 0,
                ..Default::default()
            },
            |e| matches!(e, GpuError::NoSuitableDevice),
        ),
        (
            MockConfig {
                device_extensions: Vec::new(),
                ..Default::default()
            },
            |e| matches!(e, GpuError::ExtensionNotSupported(_)),
        ),
        (
            MockConfig {
                queue_families: vec![vk::QueueFlags::COMPUTE],
                ..Default::default()
            },
            |e| matches!(e, GpuError::NoGraphicsQueue),
        ),
        (
            MockConfig {
                present_support: false,
                ..Default::default()
            },
            |e| matches!(e, GpuError::PresentNotSupported(0)),
        ),
        (
            MockConfig {
                surface_formats: vec![vk::Format::B8G8R8A8_UNORM],
                ..Default::default()
            },
            |e| matches!(e, GpuError::FormatNotSupported(_)),
        ),
        (
            MockConfig::default().unsampleable(),
            |e| matches!(e, GpuError::FormatNotSupported(_)),
        ),
        (
            MockConfig {
                fence_timeout: true,
                ..Default::default()
            },
            |e| matches!(e, GpuError::Timeout(_)),
        ),
    ];

    for (mock, expected) in cases {
        let gpu = MockGpu::new(mock);
        let err = match ready_renderer(&gpu, config(), PORTRAIT, (4, 4)) {
            Err(crate::TestError::Gpu(err)) => err,
            Err(other) => panic!("unexpected fixture error: {other}"),
            Ok(_) => panic!("initialization should have failed"),
        };
        assert!(expected(&err), "unexpected error: {err}");
        assert_released(&gpu);
    }
}

#[test]
fn missing_texture_is_reported_and_released() {
    let gpu = MockGpu::default();
    let assets = MemoryAssetSource::new()
        .with(quadview_shaders::VERTEX_SHADER, fixtures::spirv_stub())
        .with(quadview_shaders::FRAGMENT_SHADER, fixtures::spirv_stub());
    let mut renderer = Renderer::new(gpu.loader(), config());

    let err = renderer
        .initialize(&fixtures::window(), PORTRAIT, &assets)
        .unwrap_err();
    assert!(matches!(err, GpuError::Asset(_)));
    assert!(!renderer.is_ready());
    assert_released(&gpu);
}

#[test]
fn linear_sampling_uploads_directly() {
    let gpu = MockGpu::default();
    let renderer = ready_renderer(&gpu, config(), PORTRAIT, (3, 2)).unwrap();
    assert_eq!(renderer.stats().unwrap().texture_path, TexturePath::Direct);

    let events = gpu.events();
    let images: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            MockEvent::CreateImage {
                image,
                tiling,
                initial_layout,
            } => Some((*image, *tiling, *initial_layout)),
            _ => None,
        })
        .collect();
    assert_eq!(images.len(), 1);
    let (texture, tiling, initial_layout) = images[0];
    assert_eq!(tiling, vk::ImageTiling::LINEAR);
    assert_eq!(initial_layout, vk::ImageLayout::PREINITIALIZED);

    assert_eq!(
        gpu.count(|e| matches!(e, MockEvent::PipelineBarrier { .. })),
        1
    );
    assert!(events.contains(&MockEvent::PipelineBarrier {
        image: texture,
        old_layout: vk::ImageLayout::PREINITIALIZED,
        new_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
    }));
    assert_eq!(gpu.count(|e| matches!(e, MockEvent::CopyImage { .. })), 0);
    assert_eq!(
        gpu.count(|e| matches!(e, MockEvent::AllocateMemory { name, .. } if name == "texture_staging")),
        0
    );
    assert!(events.contains(&MockEvent::WaitForFence {
        timeout_ns: 100_000_000
    }));
    assert_eq!(
        gpu.image_layout(vk::Image::from_raw(texture)),
        Some(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
    );
}

#[test]
fn direct_upload_honors_row_pitch() {
    let gpu = MockGpu::default();
    let _renderer = ready_renderer(&gpu, config(), PORTRAIT, (3, 2)).unwrap();

    let pitch = gpu.row_pitch(3) as usize;
    assert_eq!(pitch, 256);
    let memory = gpu.memory_contents("texture").unwrap();
    assert_eq!(memory.len(), pitch * 2);

    for y in 0..2_usize {
        for x in 0..3_usize {
            let at = y * pitch + x * 4;
            assert_eq!(
                &memory[at..at + 4],
                &checker_texel(x as u32, y as u32),
                "texel ({x}, {y})"
            );
        }
        let padding = &memory[y * pitch + 12..(y + 1) * pitch];
        assert!(padding.iter().all(|b| *b == 0), "row {y} padding written");
    }
}

#[test]
fn optimal_only_uploads_through_staging() {
    let gpu = MockGpu::new(MockConfig::default().optimal_only());
    let renderer = ready_renderer(&gpu, config(), PORTRAIT, (3, 2)).unwrap();
    assert_eq!(renderer.stats().unwrap().texture_path, TexturePath::Staging);

    let events = gpu.events();
    let images: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            MockEvent::CreateImage { image, tiling, .. } => Some((*image, *tiling)),
            _ => None,
        })
        .collect();
    assert_eq!(images.len(), 2);
    let (staging, staging_tiling) = images[0];
    let (texture, texture_tiling) = images[1];
    assert_eq!(staging_tiling, vk::ImageTiling::LINEAR);
    assert_eq!(texture_tiling, vk::ImageTiling::OPTIMAL);

    assert!(events.contains(&MockEvent::CopyImage {
        src: staging,
        dst: texture
    }));
    assert_eq!(
        gpu.count(|e| matches!(e, MockEvent::PipelineBarrier { .. })),
        3
    );
    assert!(events.contains(&MockEvent::AllocateMemory {
        name: "texture".to_string(),
        size: 3 * 2 * 4,
        location: MemoryLocation::GpuOnly,
    }));

    // Staging memory goes only after the upload fence was waited on.
    let waited = position(&events, |e| matches!(e, MockEvent::WaitForFence { .. }));
    let freed = position(
        &events,
        |e| matches!(e, MockEvent::FreeMemory { name } if name == "texture_staging"),
    );
    assert!(waited < freed);

    assert_eq!(
        gpu.image_layout(vk::Image::from_raw(texture)),
        Some(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
    );
    assert_eq!(gpu.image_layout(vk::Image::from_raw(staging)), None);
    assert_eq!(gpu.live_count("image"), 1);
}

#[test]
fn timed_out_upload_drains_the_device_before_release() {
    let gpu = MockGpu::new(MockConfig {
        fence_timeout: true,
        ..MockConfig::default().optimal_only()
    });
    let err = match ready_renderer(&gpu, config(), PORTRAIT, (3, 2)) {
        Err(crate::TestError::Gpu(err)) => err,
        Err(other) => panic!("unexpected fixture error: {other}"),
        Ok(_) => panic!("initialization should have failed"),
    };
    assert!(matches!(err, GpuError::Timeout(_)), "unexpected error: {err}");
    assert_released(&gpu);

    // The fence, transient pool and both upload images outlive the pending copy.
    let events = gpu.events();
    let waited = position(&events, |e| matches!(e, MockEvent::WaitForFence { .. }));
    let after_wait = &events[waited..];
    let idle = position(after_wait, |e| matches!(e, MockEvent::WaitIdle));
    let first_release = position(after_wait, |e| {
        let name = e.name();
        name.starts_with("Destroy") || name.starts_with("Free")
    });
    assert!(idle < first_release, "{}", names(after_wait));
}

#[test]
fn ten_frames_on_three_images() {
    let gpu = MockGpu::default();
    let mut renderer = renderer(&gpu);

    for _ in 0..10 {
        renderer.draw_frame().unwrap();
    }

    assert_eq!(
        gpu.count(|e| matches!(e, MockEvent::CreateFramebuffer { .. })),
        3
    );
    assert_eq!(renderer.stats().unwrap().framebuffers_created, 3);
    assert_eq!(gpu.count(is_present), 10);
    assert_eq!(
        gpu.count(|e| *e
            == MockEvent::Draw {
                vertex_count: 4,
                instance_count: 1
            }),
        10
    );
    assert!(gpu.semaphore_violations().is_empty());
}

#[test]
fn framebuffers_are_created_on_first_use() {
    let gpu = MockGpu::default();
    let mut renderer = renderer(&gpu);

    for frame in 1..=5 {
        renderer.draw_frame().unwrap();
        assert_eq!(
            renderer.stats().unwrap().framebuffers_created,
            frame.min(3)
        );
    }
    assert_eq!(gpu.live_count("framebuffer"), 3);
    assert_eq!(gpu.live_count("image_view"), 4);
}

#[test]
fn acquire_semaphores_are_never_reused_while_in_flight() {
    let gpu = MockGpu::default();
    let mut renderer = renderer(&gpu);

    for _ in 0..12 {
        renderer.draw_frame().unwrap();
    }

    let acquired = acquired_semaphores(&gpu);
    assert_eq!(acquired.len(), 12);
    for (frame, semaphore) in acquired.iter().enumerate() {
        let recent = &acquired[frame.saturating_sub(3)..frame];
        assert!(
            !recent.contains(semaphore),
            "frame {frame} reused semaphore {semaphore:#x}"
        );
    }
    let mut distinct = acquired.clone();
    distinct.sort_unstable();
    distinct.dedup();
    assert_eq!(distinct.len(), 4);

    // Each submission waits on its frame's acquire semaphore and signals what present waits on.
    let events = gpu.events();
    let submits: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            MockEvent::QueueSubmit {
                wait_semaphores,
                signal_semaphores,
                fence,
                ..
            } => Some((wait_semaphores.clone(), signal_semaphores.clone(), *fence)),
            _ => None,
        })
        .skip(1) // texture upload
        .collect();
    let presents: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            MockEvent::QueuePresent { wait_semaphore, .. } => Some(*wait_semaphore),
            _ => None,
        })
        .collect();
    assert_eq!(submits.len(), 12);
    for ((waits, signals, fence), (acquire, present)) in
        submits.iter().zip(acquired.iter().zip(&presents))
    {
        assert_eq!(waits, &vec![*acquire]);
        assert_eq!(signals, &vec![*present]);
        assert_eq!(*fence, 0);
    }
    assert!(gpu.semaphore_violations().is_empty());
}

#[test]
fn frame_records_one_quad() {
    let gpu = MockGpu::default();
    let mut renderer = renderer(&gpu);
    gpu.clear_events();

    renderer.draw_frame().unwrap();

    let events = gpu.events();
    insta::assert_snapshot!(names(&events), @r"
    AcquireNextImage
    CreateImageView
    CreateFramebuffer
    BeginCommandBuffer
    BeginRenderPass
    SetViewport
    SetScissor
    BindPipeline
    BindDescriptorSet
    BindVertexBuffer
    Draw
    EndRenderPass
    EndCommandBuffer
    QueueSubmit
    QueuePresent
    ");

    let clear_color = events.iter().find_map(|e| match e {
        MockEvent::BeginRenderPass { clear_color, .. } => Some(*clear_color),
        _ => None,
    });
    assert_eq!(clear_color, Some([0.5, 0.5, 0.5, 1.0]));
    assert!(events.contains(&MockEvent::SetViewport {
        width: 1080.0,
        height: 1920.0
    }));
}

#[test]
fn revisited_image_reuses_its_framebuffer() {
    let gpu = MockGpu::default();
    let mut renderer = renderer(&gpu);
    for _ in 0..3 {
        renderer.draw_frame().unwrap();
    }
    gpu.clear_events();

    renderer.draw_frame().unwrap();

    let events = gpu.events();
    assert!(events
        .iter()
        .any(|e| matches!(e, MockEvent::AcquireNextImage { image_index: 0, .. })));
    assert_eq!(
        gpu.count(|e| matches!(
            e,
            MockEvent::CreateFramebuffer { .. } | MockEvent::CreateImageView { .. }
        )),
        0
    );
    assert_eq!(gpu.count(is_present), 1);
}

#[test]
fn teardown_is_ordered_and_idempotent() {
    let gpu = MockGpu::default();
    let mut renderer = renderer(&gpu);
    renderer.draw_frame().unwrap();
    renderer.draw_frame().unwrap();

    renderer.destroy();
    renderer.destroy();
    assert!(!renderer.is_ready());
    drop(renderer);

    assert_released(&gpu);

    let events = gpu.events();
    assert_eq!(events.last(), Some(&MockEvent::DestroyInstance));
    assert_eq!(
        gpu.count(|e| matches!(e, MockEvent::DestroyInstance)),
        1
    );
    assert_eq!(gpu.count(|e| matches!(e, MockEvent::DestroyDevice)), 1);

    let device_gone = position(&events, |e| matches!(e, MockEvent::DestroyDevice));
    let last_object = events
        .iter()
        .rposition(|e| {
            let name = e.name();
            (name.starts_with("Destroy") || name.starts_with("Free"))
                && !matches!(e, MockEvent::DestroyDevice | MockEvent::DestroyInstance)
        })
        .unwrap();
    assert!(last_object < device_gone);

    let swapchain_gone = position(&events, |e| matches!(e, MockEvent::DestroySwapchain { .. }));
    let surface_gone = position(&events, |e| matches!(e, MockEvent::DestroySurface { .. }));
    assert!(swapchain_gone < surface_gone);

    // Nothing is released before the device went idle after the last frame.
    let last_present = events.iter().rposition(is_present).unwrap();
    let teardown = &events[last_present..];
    let idle = position(teardown, |e| matches!(e, MockEvent::WaitIdle));
    let first_release = position(teardown, |e| {
        let name = e.name();
        name.starts_with("Destroy") || name.starts_with("Free")
    });
    assert!(idle < first_release);
}

#[test]
fn draw_is_a_no_op_unless_ready() {
    let gpu = MockGpu::default();
    let assets = fixtures::assets(4, 4).unwrap();
    let mut renderer = Renderer::new(gpu.loader(), config());

    renderer.draw_frame().unwrap();
    renderer.resize(640, 480).unwrap();
    assert!(gpu.events().is_empty());

    renderer
        .initialize(&fixtures::window(), PORTRAIT, &assets)
        .unwrap();
    renderer.destroy();
    gpu.clear_events();

    renderer.draw_frame().unwrap();
    assert!(gpu.events().is_empty());

    // A terminated renderer can come back.
    renderer
        .initialize(&fixtures::window(), PORTRAIT, &assets)
        .unwrap();
    renderer.draw_frame().unwrap();
    assert_eq!(gpu.count(is_present), 1);
}

#[test]
fn out_of_date_acquire_rebuilds_the_swapchain() {
    let gpu = MockGpu::default();
    let mut renderer = renderer(&gpu);
    renderer.draw_frame().unwrap();
    let first = created_swapchains(&gpu)[0].0;

    gpu.set_surface_extent(1920, 1080);
    gpu.fail_next_acquire(vk::Result::ERROR_OUT_OF_DATE_KHR);
    renderer.draw_frame().unwrap();

    let swapchains = created_swapchains(&gpu);
    assert_eq!(swapchains.len(), 2);
    assert_eq!(swapchains[1].1, first);
    assert_eq!(swapchains[1].2, (1920, 1080));
    assert!(gpu
        .events()
        .contains(&MockEvent::DestroySwapchain { swapchain: first }));
    assert_eq!(gpu.count(is_present), 1);

    let stats = renderer.stats().unwrap();
    assert_eq!(stats.extent, (1920, 1080));
    assert_eq!(stats.framebuffers_created, 0);
    assert_eq!(stats.command_buffers, 3);
    assert_eq!(stats.semaphores, 8);

    renderer.draw_frame().unwrap();
    assert_eq!(gpu.count(is_present), 2);
    assert_eq!(gpu.live_count("swapchain"), 1);
    assert_eq!(gpu.live_count("framebuffer"), 1);
    assert_eq!(gpu.live_count("semaphore"), 8);
    assert!(gpu.semaphore_violations().is_empty());
}

#[test]
fn out_of_date_present_rebuilds_the_swapchain() {
    let gpu = MockGpu::default();
    let mut renderer = renderer(&gpu);

    gpu.fail_next_present(vk::Result::ERROR_OUT_OF_DATE_KHR);
    renderer.draw_frame().unwrap();
    assert_eq!(created_swapchains(&gpu).len(), 2);

    renderer.draw_frame().unwrap();
    assert_eq!(gpu.count(is_present), 1);
    assert!(gpu.semaphore_violations().is_empty());
}

#[test]
fn out_of_date_is_fatal_without_resize_handling() {
    let gpu = MockGpu::default();
    let mut renderer =
        ready_renderer(&gpu, config().with_resize(false), PORTRAIT, (4, 4)).unwrap();

    gpu.fail_next_acquire(vk::Result::ERROR_OUT_OF_DATE_KHR);
    let err = renderer.draw_frame().unwrap_err();
    assert!(matches!(
        err,
        GpuError::Vulkan(vk::Result::ERROR_OUT_OF_DATE_KHR)
    ));
    assert_eq!(created_swapchains(&gpu).len(), 1);
}

#[test]
fn failed_rebuild_leaves_the_renderer_uninitialized() {
    let gpu = MockGpu::default();
    let mut renderer = renderer(&gpu);
    renderer.draw_frame().unwrap();

    gpu.fail_next_acquire(vk::Result::ERROR_OUT_OF_DATE_KHR);
    gpu.fail_next_swapchain(vk::Result::ERROR_SURFACE_LOST_KHR);
    let err = renderer.draw_frame().unwrap_err();
    assert!(matches!(
        err,
        GpuError::Vulkan(vk::Result::ERROR_SURFACE_LOST_KHR)
    ));
    assert!(!renderer.is_ready());
    assert!(renderer.stats().is_none());

    gpu.clear_events();
    renderer.draw_frame().unwrap();
    renderer.resize(640, 480).unwrap();
    assert!(gpu.events().is_empty());

    drop(renderer);
    assert_released(&gpu);
}

#[test]
fn suboptimal_is_success() {
    let gpu = MockGpu::default();
    let mut renderer = renderer(&gpu);

    gpu.fail_next_acquire(vk::Result::SUBOPTIMAL_KHR);
    gpu.fail_next_present(vk::Result::SUBOPTIMAL_KHR);
    renderer.draw_frame().unwrap();

    assert_eq!(gpu.count(is_present), 1);
    assert_eq!(created_swapchains(&gpu).len(), 1);
}

#[test]
fn resize_rebuilds_and_refits_the_quad() {
    let gpu = MockGpu::new(MockConfig::default().with_surface_extent(u32::MAX, u32::MAX));
    let mut renderer = ready_renderer(&gpu, config(), (480, 640), (4, 4)).unwrap();
    assert_eq!(renderer.stats().unwrap().extent, (480, 640));

    let quad = |gpu: &MockGpu| -> Vec<QuadVertex> {
        gpu.memory_contents("quad_vertices")
            .unwrap()
            .chunks_exact(QuadVertex::STRIDE as usize)
            .map(bytemuck::pod_read_unaligned)
            .collect()
    };
    let before = quad(&gpu);
    assert_eq!((before[0].position.x, before[0].position.y), (-1.0, -0.75));

    renderer.resize(800, 600).unwrap();
    assert_eq!(renderer.stats().unwrap().extent, (800, 600));
    let after = quad(&gpu);
    assert_eq!((after[0].position.x, after[0].position.y), (-0.75, -1.0));
    assert_eq!((after[3].uv.x, after[3].uv.y), (1.0, 1.0));

    // Degenerate sizes are ignored.
    renderer.resize(0, 600).unwrap();
    assert_eq!(created_swapchains(&gpu).len(), 2);
}

#[test]
fn resize_can_be_disabled() {
    let gpu = MockGpu::default();
    let mut renderer =
        ready_renderer(&gpu, config().with_resize(false), PORTRAIT, (4, 4)).unwrap();

    renderer.resize(640, 480).unwrap();
    assert_eq!(created_swapchains(&gpu).len(), 1);
}

#[test]
fn engine_runs_a_window_lifecycle() {
    let gpu = MockGpu::default();
    let assets = fixtures::assets(4, 4).unwrap();
    let engine = Engine::new(Renderer::new(gpu.loader(), config()));

    engine.on_init_window(&fixtures::window(), PORTRAIT, &assets);
    assert!(engine.is_ready());
    assert!(!engine.is_animating());
    engine.draw_frame();
    assert_eq!(gpu.count(is_present), 0);

    engine.on_gained_focus();
    for _ in 0..100 {
        engine.draw_frame();
    }
    assert_eq!(engine.saved_state().frame_count, 100);
    assert_eq!(gpu.count(is_present), 100);

    let blob = engine.on_save_state();
    engine.on_term_window();
    engine.on_term_window();
    assert!(!engine.is_ready());
    assert!(!engine.is_animating());
    assert_released(&gpu);

    engine.on_load_state(&blob);
    engine.on_init_window(&fixtures::window(), PORTRAIT, &assets);
    engine.on_gained_focus();
    engine.draw_frame();
    assert_eq!(engine.saved_state().frame_count, 101);
    assert_eq!(engine.stats().unwrap().framebuffers_created, 1);
}

#[test]
#[should_panic(expected = "Frame failed")]
fn engine_treats_a_lost_device_as_fatal() {
    let gpu = MockGpu::default();
    let assets = fixtures::assets(4, 4).unwrap();
    let engine = Engine::new(Renderer::new(gpu.loader(), config()));
    engine.on_init_window(&fixtures::window(), PORTRAIT, &assets);
    engine.on_gained_focus();

    gpu.fail_next_acquire(vk::Result::ERROR_DEVICE_LOST);
    engine.draw_frame();
}
